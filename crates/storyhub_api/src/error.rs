//! Error types for the remote-authority client.

use thiserror::Error;

/// Errors from the remote-authority client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The operation requires a bearer token and none is set.
    #[error("Authentication required: no bearer token is set")]
    AuthRequired,

    /// The request never produced a response from the authority.
    #[error("Network failure: {message}")]
    Network {
        /// Transport-level description of the failure.
        message: String,
        /// Whether retrying the same request may succeed.
        retryable: bool,
    },

    /// The authority answered with a non-success status.
    #[error("Rejected by the remote authority (status {status}): {message}")]
    Rejected {
        /// HTTP status code of the response.
        status: u16,
        /// Message text from the authority's response body, or the
        /// status line when the body carried none.
        message: String,
    },

    /// A response body could not be parsed as the expected JSON shape.
    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Creates a retryable network error.
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable network error.
    pub fn network_fatal(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a rejection error.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Returns true if retrying the operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network { retryable: true, .. })
    }
}

/// Result alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability() {
        assert!(ApiError::network("timed out").is_retryable());
        assert!(!ApiError::network_fatal("dns failure").is_retryable());
        assert!(!ApiError::AuthRequired.is_retryable());
        assert!(!ApiError::rejected(400, "bad payload").is_retryable());
    }

    #[test]
    fn display_includes_authority_message() {
        let err = ApiError::rejected(413, "photo too large");
        assert!(err.to_string().contains("413"));
        assert!(err.to_string().contains("photo too large"));
    }
}
