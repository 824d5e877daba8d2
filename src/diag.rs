//! Diagnostic sink: the single place failure context leaves the core.
//! Write-only from the core's perspective; nothing here is ever read back.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{error, warn};

use crate::model::PriceQuote;

/// Structured record of one failed check, assembled at the orchestrator
/// boundary.
#[derive(Debug)]
pub struct FailureReport<'a> {
    pub reservation_id: &'a str,
    /// Name of the step that failed.
    pub step: &'static str,
    pub error: String,
    /// Last page URL observed before the failure, when one was observed.
    pub last_url: Option<String>,
    /// Rendered-page snapshot for offline inspection, when one could be
    /// captured.
    pub screenshot: Option<Vec<u8>>,
    /// The extracted quote, when extraction succeeded but persistence did
    /// not. The data must not be dropped silently.
    pub quote: Option<&'a PriceQuote>,
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, report: &FailureReport<'_>);
}

/// Logs failure records through `tracing` and writes screenshots to a
/// directory, timestamped per failure.
pub struct FsDiagnostics {
    dir: PathBuf,
}

impl FsDiagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_screenshot(&self, reservation_id: &str, png: &[u8]) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let name = format!(
            "failure_{}_{}.png",
            reservation_id,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.dir.join(name);
        fs::write(&path, png)?;
        Ok(path)
    }
}

impl DiagnosticSink for FsDiagnostics {
    fn report(&self, report: &FailureReport<'_>) {
        error!(
            reservation = report.reservation_id,
            step = report.step,
            last_url = report.last_url.as_deref().unwrap_or("<none>"),
            error = %report.error,
            "check failed"
        );
        if let Some(quote) = report.quote {
            error!(
                reservation = report.reservation_id,
                quote = %serde_json::to_string(quote).unwrap_or_default(),
                "extracted quote retained from failed persistence"
            );
        }
        if let Some(png) = &report.screenshot {
            match self.write_screenshot(report.reservation_id, png) {
                Ok(path) => error!(
                    reservation = report.reservation_id,
                    path = %path.display(),
                    "failure screenshot saved"
                ),
                Err(err) => warn!(
                    reservation = report.reservation_id,
                    error = %err,
                    "could not save failure screenshot"
                ),
            }
        }
    }
}

/// Drops every report. For tests and callers that do their own reporting.
pub struct DiscardDiagnostics;

impl DiagnosticSink for DiscardDiagnostics {
    fn report(&self, _report: &FailureReport<'_>) {}
}
