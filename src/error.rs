//! Error types for SkyGuard.
//!
//! Every fallible internal step returns `SkyGuardError`. Transport errors are
//! absorbed at the `AqiSource` boundary (see `client`), derivation errors
//! surface as the session `Error` state, and the rest reach the HTTP layer.

use thiserror::Error;

/// Custom error type for SkyGuard operations.
#[derive(Debug, Error)]
pub enum SkyGuardError {
    /// Error reading or writing files, or binding the listener.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error making HTTP requests, including timeouts and body decoding.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status.
    #[error("backend returned status {status} for {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    /// Configured backend base URL cannot be turned into a request URL.
    #[error("invalid backend URL: {0}")]
    InvalidBaseUrl(String),

    /// Template loading or rendering failed.
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// A reading was fetched but cannot be turned into display values.
    #[error("{0}")]
    Derivation(String),

    /// The cache maintenance scheduler could not be set up.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
