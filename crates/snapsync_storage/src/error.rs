//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored record could not be serialized or parsed.
    #[error("record serialization error: {0}")]
    Serialization(String),

    /// A backend holds data it cannot interpret.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// Every backend in the fallback chain failed its probe.
    #[error("no storage backend available: all candidates failed probing")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert!(StorageError::Unavailable.to_string().contains("probing"));
        assert!(StorageError::Corrupted("bad index".into())
            .to_string()
            .contains("bad index"));
    }
}
