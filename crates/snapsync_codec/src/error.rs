//! Error types for token encoding and decoding.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding tokens.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The token cannot be parsed into an envelope shape.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The envelope declares a format version the decoder does not accept.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    /// Encryption was requested or declared, but no password was supplied.
    #[error("payload is encrypted but no password was supplied")]
    MissingPassword,

    /// Authenticated decryption failed (wrong password or tampered payload).
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// The payload claims compression but no algorithm could inflate it.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// The value could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl CodecError {
    /// Creates a malformed-token error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken(message.into())
    }
}
