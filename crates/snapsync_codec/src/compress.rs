//! Compression strategies for token payloads.
//!
//! Two interchangeable algorithms are supported: LZ4 (cheap, always a
//! safe default) and Deflate (stronger ratio, preferred for larger
//! payloads). Compressed bytes are rendered as URL-safe base64 so the
//! result stays a text payload.
//!
//! Decoding does not require knowing which algorithm produced the text:
//! [`decompress`] tries each known algorithm and accepts the first result
//! that re-parses as valid JSON (falling back to any well-formed UTF-8
//! result when none parses).

use crate::error::{CodecError, CodecResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Payloads at or above this size (bytes) use the stronger algorithm
/// under [`CompressMode::Auto`].
pub const AUTO_STRONG_THRESHOLD: usize = 1024;

/// A supported compression algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    /// LZ4 block compression with a length prefix.
    Lz4,
    /// Raw DEFLATE.
    Deflate,
}

impl CompressionAlgorithm {
    /// All algorithms, in auto-detection trial order.
    pub const ALL: [CompressionAlgorithm; 2] =
        [CompressionAlgorithm::Lz4, CompressionAlgorithm::Deflate];
}

/// How the encoder chooses a compression algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressMode {
    /// Do not compress.
    #[default]
    Off,
    /// Pick by payload size: LZ4 below [`AUTO_STRONG_THRESHOLD`],
    /// Deflate at or above it. Compression is skipped entirely when it
    /// would not shrink the rendered payload.
    Auto,
    /// Always use the given algorithm.
    Force(CompressionAlgorithm),
}

/// Compresses text with the given algorithm.
///
/// The result is URL-safe base64 of the compressed bytes.
pub fn compress(text: &str, algorithm: CompressionAlgorithm) -> CodecResult<String> {
    let bytes = match algorithm {
        CompressionAlgorithm::Lz4 => lz4_flex::compress_prepend_size(text.as_bytes()),
        CompressionAlgorithm::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(text.as_bytes())
                .map_err(|e| CodecError::Serialization(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CodecError::Serialization(e.to_string()))?
        }
    };
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compresses text, choosing the algorithm by payload size.
///
/// Returns `None` when compression would not shrink the rendered
/// payload, in which case the caller should keep the original text.
pub fn compress_auto(text: &str) -> CodecResult<Option<(String, CompressionAlgorithm)>> {
    let algorithm = if text.len() < AUTO_STRONG_THRESHOLD {
        CompressionAlgorithm::Lz4
    } else {
        CompressionAlgorithm::Deflate
    };

    let compressed = compress(text, algorithm)?;
    if compressed.len() >= text.len() {
        return Ok(None);
    }
    Ok(Some((compressed, algorithm)))
}

/// Decompresses text produced by [`compress`].
///
/// With an explicit algorithm, only that algorithm is tried. Without
/// one, every known algorithm is tried in order; the first result that
/// re-parses as valid JSON wins, and a well-formed UTF-8 result is
/// accepted if none parses. Fails with
/// [`CodecError::DecompressionFailed`] rather than returning corrupted
/// text.
pub fn decompress(text: &str, algorithm: Option<CompressionAlgorithm>) -> CodecResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|e| CodecError::DecompressionFailed(format!("invalid base64: {e}")))?;

    if let Some(algorithm) = algorithm {
        return decompress_bytes(&bytes, algorithm);
    }

    let mut fallback = None;
    for candidate in CompressionAlgorithm::ALL {
        if let Ok(decoded) = decompress_bytes(&bytes, candidate) {
            if serde_json::from_str::<serde_json::Value>(&decoded).is_ok() {
                return Ok(decoded);
            }
            fallback.get_or_insert(decoded);
        }
    }

    fallback.ok_or_else(|| {
        CodecError::DecompressionFailed("no known algorithm could inflate the payload".into())
    })
}

fn decompress_bytes(bytes: &[u8], algorithm: CompressionAlgorithm) -> CodecResult<String> {
    let inflated = match algorithm {
        CompressionAlgorithm::Lz4 => lz4_flex::decompress_size_prepended(bytes)
            .map_err(|e| CodecError::DecompressionFailed(e.to_string()))?,
        CompressionAlgorithm::Deflate => {
            let mut decoder = DeflateDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| CodecError::DecompressionFailed(e.to_string()))?;
            out
        }
    };

    String::from_utf8(inflated)
        .map_err(|e| CodecError::DecompressionFailed(format!("invalid UTF-8: {e}")))
}
