//! Error types for the sync layer.

use storyhub_api::ApiError;
use storyhub_store::StoreError;
use thiserror::Error;

/// Errors from the sync engine and push manager.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The remote authority client failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Result alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
