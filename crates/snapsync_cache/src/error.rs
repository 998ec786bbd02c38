//! Error types for the offline cache.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Token encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] snapsync_codec::CodecError),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] snapsync_storage::StorageError),

    /// A caller-supplied schema gate rejected the value.
    #[error("validation error: {0}")]
    Validation(String),

    /// The value could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(String),
}
