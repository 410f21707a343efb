//! Error types for the gateway.

use thiserror::Error;

/// Errors from request handling and activation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The network failed and no cached copy could stand in.
    #[error("Fetch failed: {message}")]
    Fetch {
        /// Transport-level description of the failure.
        message: String,
    },

    /// A shell asset could not be precached; nothing was installed.
    #[error("Activation failed on {asset}: {reason}")]
    Activation {
        /// The asset that failed.
        asset: String,
        /// Why it failed.
        reason: String,
    },
}

impl GatewayError {
    /// Creates a fetch error.
    pub fn fetch(message: impl Into<String>) -> Self {
        GatewayError::Fetch {
            message: message.into(),
        }
    }

    /// Creates an activation error.
    pub fn activation(asset: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::Activation {
            asset: asset.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
