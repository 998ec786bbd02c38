//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or transport failure.
    #[error("network failure: {message}")]
    Network {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Token encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] snapsync_codec::CodecError),

    /// The offline cache failed.
    #[error("cache error: {0}")]
    Cache(#[from] snapsync_cache::CacheError),

    /// The storage layer failed.
    #[error("storage error: {0}")]
    Storage(#[from] snapsync_storage::StorageError),

    /// A caller-supplied schema gate rejected the value.
    #[error("validation error: {0}")]
    Validation(String),

    /// The state value could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A sync cycle is already running for this store.
    #[error("sync already in progress")]
    AlreadySyncing,

    /// All retry attempts were exhausted.
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The last error encountered.
        last_error: String,
    },
}

impl SyncError {
    /// Creates a retryable network error.
    pub fn network_retryable(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable network error.
    pub fn network_fatal(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network { retryable: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::network_retryable("connection reset").is_retryable());
        assert!(!SyncError::network_fatal("bad certificate").is_retryable());
        assert!(!SyncError::AlreadySyncing.is_retryable());
        assert!(!SyncError::Validation("nope".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::RetriesExhausted {
            attempts: 3,
            last_error: "timeout".into(),
        };
        assert!(err.to_string().contains('3'));
        assert!(err.to_string().contains("timeout"));
    }
}
