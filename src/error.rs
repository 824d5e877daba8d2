use thiserror::Error;

use crate::model::PriceQuote;

#[derive(Debug, Error)]
pub enum Error {
    /// A required startup parameter is missing. Fatal at process start,
    /// never raised per reservation.
    #[error("missing required configuration: {0}")]
    Config(String),

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    Js(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// A form step did not reach its expected state within its bound.
    /// Carries the last observed page URL for offline diagnosis.
    #[error("form step '{step}' failed at {last_url}: {reason}")]
    FormStep {
        step: &'static str,
        reason: String,
        last_url: String,
    },

    /// The page never left the search view and never rendered result rows.
    #[error("no results after {waited_secs}s, page still at {last_url}")]
    ResultsTimeout { last_url: String, waited_secs: u64 },

    /// Extraction finished but no row survived validation.
    #[error("no valid prices extracted from the results page")]
    EmptyQuote,

    #[error("record store request failed: {0}")]
    Store(#[from] reqwest::Error),

    #[error("record store returned status {status} for {url}")]
    StoreStatus { status: u16, url: String },

    #[error("reservation {0} not found in the record store")]
    ReservationNotFound(String),

    /// Extraction succeeded but the store rejected the insert. The quote is
    /// carried along so the failure record can surface it instead of
    /// silently dropping the data.
    #[error("snapshot for reservation {reservation_id} was not persisted")]
    SnapshotNotPersisted {
        reservation_id: String,
        quote: PriceQuote,
        #[source]
        source: Box<Error>,
    },

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Name of the pipeline step this error belongs to, for failure records.
    pub fn failing_step(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration",
            Error::Launch(_) => "acquire-session",
            Error::Navigation(_) => "navigate",
            Error::FormStep { step, .. } => step,
            Error::ResultsTimeout { .. } => "await-results",
            Error::EmptyQuote => "extract-prices",
            Error::Store(_) | Error::StoreStatus { .. } | Error::ReservationNotFound(_) => {
                "record-store"
            }
            Error::SnapshotNotPersisted { .. } => "record-snapshot",
            Error::Screenshot(_) => "screenshot",
            Error::ElementNotFound(_) | Error::Timeout(_) | Error::Js(_) | Error::Cdp(_) => {
                "browser"
            }
            Error::Io(_) => "io",
        }
    }

    /// Last page URL observed before the failure, when the error recorded one.
    pub fn last_url(&self) -> Option<&str> {
        match self {
            Error::FormStep { last_url, .. } | Error::ResultsTimeout { last_url, .. } => {
                Some(last_url)
            }
            _ => None,
        }
    }

    /// The extracted quote attached to a persistence failure, if any.
    pub fn quote(&self) -> Option<&PriceQuote> {
        match self {
            Error::SnapshotNotPersisted { quote, .. } => Some(quote),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
