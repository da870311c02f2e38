use reqwest::StatusCode;
use thiserror::Error;

/// Failure to read a value from the instance metadata service.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The HTTP client could not be constructed.
    #[error("failed to build metadata http client")]
    Build(#[source] reqwest::Error),

    /// The configured endpoint is not a usable URL.
    #[error("invalid metadata endpoint '{endpoint}'")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// Transport-level failure (connection refused, timeout, ...).
    #[error("metadata request for '{key}' failed")]
    Request {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("metadata request for '{key}' returned {status}")]
    Status { key: String, status: StatusCode },
}

impl MetadataError {
    /// True when the service answered 404, i.e. the key is not present.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, MetadataError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}
