//! Checker Orchestrator: drives one reservation end-to-end and batches of
//! reservations with failure isolation. Exactly one reservation occupies a
//! session from acquire to release; the session is released on every exit
//! path.

use tracing::{error, info};

use crate::browser::{Session, SessionProvider};
use crate::config::CheckerConfig;
use crate::diag::{DiagnosticSink, FailureReport};
use crate::driver::PageDriver;
use crate::error::{Error, Result};
use crate::extract;
use crate::form::SearchForm;
use crate::model::{PriceSnapshot, Reservation};
use crate::results;
use crate::store::RecordStore;

/// Outcome counts for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct PriceChecker<P: SessionProvider> {
    provider: P,
    store: RecordStore,
    config: CheckerConfig,
    diagnostics: Box<dyn DiagnosticSink>,
}

impl<P: SessionProvider> PriceChecker<P> {
    pub fn new(
        provider: P,
        store: RecordStore,
        config: CheckerConfig,
        diagnostics: Box<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            diagnostics,
        }
    }

    /// Check every reservation in the store, sequentially, isolating each
    /// reservation's failure so one bad reservation never aborts the batch.
    /// A fixed pacing delay separates consecutive checks.
    pub async fn run_batch(&self) -> Result<BatchSummary> {
        let ids = self.store.list_reservations().await?;
        if ids.is_empty() {
            info!("no reservations to check");
            return Ok(BatchSummary {
                succeeded: 0,
                failed: 0,
            });
        }

        info!(count = ids.len(), "starting batch price check");
        let mut summary = BatchSummary {
            succeeded: 0,
            failed: 0,
        };
        for (index, id) in ids.iter().enumerate() {
            match self.check_by_id(id).await {
                Ok(snapshot) => {
                    summary.succeeded += 1;
                    info!(
                        reservation = %id,
                        lowest_category = %snapshot.lowest_category,
                        lowest_price = snapshot.lowest_price,
                        "check succeeded"
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(reservation = %id, error = %err, "check failed, moving to next reservation");
                }
            }
            if index + 1 < ids.len() {
                tokio::time::sleep(self.config.pacing_delay).await;
            }
        }
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch price check complete"
        );
        Ok(summary)
    }

    /// Fetch one reservation from the store and check it.
    pub async fn check_by_id(&self, id: &str) -> Result<PriceSnapshot> {
        let reservation = match self.store.get_reservation(id).await {
            Ok(reservation) => reservation,
            Err(err) => {
                self.diagnostics.report(&FailureReport {
                    reservation_id: id,
                    step: err.failing_step(),
                    error: err.to_string(),
                    last_url: None,
                    screenshot: None,
                    quote: None,
                });
                return Err(err);
            }
        };
        self.check(&reservation).await
    }

    /// Run the full pipeline for one reservation. The session is released
    /// exactly once, whatever happens after acquisition.
    pub async fn check(&self, reservation: &Reservation) -> Result<PriceSnapshot> {
        info!(
            reservation = %reservation.id,
            location = %reservation.location,
            "starting price check"
        );
        let mut session = match self.provider.acquire().await {
            Ok(session) => session,
            Err(err) => {
                self.diagnostics.report(&FailureReport {
                    reservation_id: &reservation.id,
                    step: err.failing_step(),
                    error: err.to_string(),
                    last_url: None,
                    screenshot: None,
                    quote: None,
                });
                return Err(err);
            }
        };

        let outcome = self.run_steps(&session, reservation).await;
        if let Err(err) = &outcome {
            self.report_failure(&session, reservation, err).await;
        }
        session.release().await;
        outcome
    }

    async fn run_steps(
        &self,
        session: &P::Session,
        reservation: &Reservation,
    ) -> Result<PriceSnapshot> {
        session.navigate(&self.config.search_url).await?;

        let mut form = SearchForm::new(session, self.config.form_timeouts());
        form.fill(reservation).await?;

        results::await_results(session, &self.config.search_url, &self.config.detection_policy())
            .await?;

        let quote = extract::extract_quote(session, self.config.bounds).await?;
        info!(
            reservation = %reservation.id,
            categories = quote.len(),
            "extracted validated quote"
        );

        match self.store.record_snapshot(&reservation.id, quote.clone()).await {
            Ok(snapshot) => Ok(snapshot),
            Err(source) => Err(Error::SnapshotNotPersisted {
                reservation_id: reservation.id.clone(),
                quote,
                source: Box::new(source),
            }),
        }
    }

    async fn report_failure(&self, session: &P::Session, reservation: &Reservation, err: &Error) {
        let screenshot = session.screenshot().await.ok();
        let last_url = match err.last_url() {
            Some(url) => Some(url.to_owned()),
            None => session.current_url().await.ok(),
        };
        self.diagnostics.report(&FailureReport {
            reservation_id: &reservation.id,
            step: err.failing_step(),
            error: err.to_string(),
            last_url,
            screenshot,
            quote: err.quote(),
        });
    }
}
