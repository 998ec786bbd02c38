//! Error types for the sync server.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling sync requests.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request's auth token was missing, malformed or expired.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A token in the request could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] snapsync_codec::CodecError),

    /// The request was structurally invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
