//! Error types for the durable store.

use crate::record::RecordId;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The platform denied persistent storage. Fatal to all store
    /// operations; surfaced once at open time.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of why storage could not be obtained.
        message: String,
    },

    /// A referenced record does not exist. Local and recoverable; the
    /// caller decides what to do.
    #[error("record not found: {id}")]
    NotFound {
        /// The record ID that was not found.
        id: RecordId,
    },

    /// Snapshot encoding or decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// An I/O error occurred while persisting or loading a snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted snapshot has an invalid format.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// A schema migration failed.
    #[error("migration failed: {message}")]
    MigrationFailed {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a storage unavailable error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(id: RecordId) -> Self {
        Self::NotFound { id }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a migration failed error.
    pub fn migration_failed(message: impl Into<String>) -> Self {
        Self::MigrationFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::not_found(RecordId::new(7));
        assert_eq!(err.to_string(), "record not found: 7");

        let err = StoreError::storage_unavailable("lock held");
        assert!(err.to_string().contains("lock held"));
    }
}
