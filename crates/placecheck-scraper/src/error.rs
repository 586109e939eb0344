use placecheck_core::IdentityError;
use thiserror::Error;

/// Failures raised by a source provider (HTTP fetcher or browser renderer).
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url}")]
    RateLimited { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The browser session could not be started at all.
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    /// A single render failed after the browser was up.
    #[error("browser error: {0}")]
    Browser(String),

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },
}

/// Request-aborting failures of the extraction pipeline. Missing fields are
/// never an error; they surface as empty values in the record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("no listing source is reachable: {reason}")]
    ProviderUnavailable { reason: String },

    #[error("extraction exceeded its {secs}s budget")]
    TimedOut { secs: u64 },
}

/// Failures of the competitor batch as a whole. Per-listing failures are
/// skipped and never reach the caller.
#[derive(Debug, Error)]
pub enum CompetitorError {
    #[error("competitor search page unavailable: {0}")]
    SearchUnavailable(#[source] ScraperError),

    #[error("competitor search term is empty")]
    EmptyTerm,
}
