//! Error types for Muster
//!
//! All errors in the crate are converted to `AppError`. Remote-resolution
//! failures are collapsed to `NotFound` at the service boundary; see
//! `service::collapse_remote_error`.

use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Identifier could not be parsed into a handle
    #[error("unparsable identifier: {0}")]
    Unparsable(String),

    /// Identity, link, or actor does not exist (or is unreachable after the
    /// bounded retry)
    #[error("resource not found")]
    NotFound,

    /// Transient network/DNS failure, distinguishable from a definitive 404
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    /// JRD or actor document failed structural validation
    #[error("malformed remote document: {0}")]
    MalformedDocument(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Whether this error came from talking to a remote server (as opposed to
    /// local storage or configuration).
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            AppError::NotFound
                | AppError::Upstream(_)
                | AppError::MalformedDocument(_)
                | AppError::HttpClient(_)
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
