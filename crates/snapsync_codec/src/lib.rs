//! # snapsync codec
//!
//! The layered encoding pipeline for snapsync tokens: an arbitrary JSON
//! value becomes a compact, versioned, optionally compressed and
//! optionally encrypted URL-safe text token, and back.
//!
//! ## Pipeline
//!
//! ```text
//! value ──canonical JSON──► compress? ──► encrypt? ──► envelope ──► token
//! ```
//!
//! Compression always runs before encryption. The decoder reverses the
//! order and supports tokens produced by older peers: both the
//! wrapped-object envelope form and the bare `c_`/`e_`/`ec_` prefix
//! form decode, and a best-effort mode tries an ordered list of payload
//! interpretations for tokens of unknown provenance.
//!
//! ## Example
//!
//! ```rust
//! use snapsync_codec::{decode, encode, DecodeOptions, EncodeOptions};
//! use serde_json::json;
//!
//! let value = json!({"count": 3});
//! let token = encode(&value, &EncodeOptions::new()).unwrap();
//! assert_eq!(decode(&token, &DecodeOptions::new()).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod compress;
mod decoder;
mod encoder;
mod envelope;
mod error;
mod json;

pub use compress::{CompressMode, CompressionAlgorithm, AUTO_STRONG_THRESHOLD};
pub use decoder::decode;
pub use encoder::encode;
pub use envelope::{
    is_supported_version, prefix_for, strip_prefix, DecodeOptions, EncodeOptions, Envelope,
    PrefixFlags, FORMAT_VERSION, FORMAT_VERSION_PREFIXED, SUPPORTED_VERSIONS,
};
pub use error::{CodecError, CodecResult};
pub use json::to_canonical_json;
