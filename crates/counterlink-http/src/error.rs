//! HTTP client error types.

use thiserror::Error;

/// Errors returned by [`ApiClient`](crate::ApiClient).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with a non-success status and no error body.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The server rejected the input (`{"error": ...}` body).
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The base URL is unusable.
    #[error("invalid base URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Response body could not be decoded.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Returns `true` if this error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ApiError::Http("connection refused".into()).is_retryable());
        assert!(ApiError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!ApiError::Status { status: 404, body: String::new() }.is_retryable());
        assert!(!ApiError::Rejected { status: 400, message: "bad".into() }.is_retryable());
    }
}
