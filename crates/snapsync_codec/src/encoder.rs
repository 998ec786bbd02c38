//! Token encoding: value → canonical JSON → compress → encrypt → envelope.

use crate::cipher;
use crate::compress::{self, CompressMode};
use crate::envelope::{
    prefix_for, Envelope, EncodeOptions, FORMAT_VERSION, FORMAT_VERSION_PREFIXED,
};
use crate::error::{CodecError, CodecResult};
use crate::json::to_canonical_json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Encodes a value into a single URL-safe text token.
///
/// The pipeline is: canonical JSON → optional compression → optional
/// encryption → envelope → base64. Compression runs before encryption;
/// compressing ciphertext is wasted work and can leak length
/// information.
///
/// # Errors
///
/// Returns [`CodecError::MissingPassword`] if encryption is requested
/// without a password, and [`CodecError::UnsupportedVersion`] if an
/// unknown format version is requested.
pub fn encode(value: &Value, options: &EncodeOptions) -> CodecResult<String> {
    let json = to_canonical_json(value)?;

    let (payload, compressed) = match options.compress {
        CompressMode::Off => (json, false),
        CompressMode::Auto => match compress::compress_auto(&json)? {
            Some((compressed, _)) => (compressed, true),
            None => (json, false),
        },
        CompressMode::Force(algorithm) => (compress::compress(&json, algorithm)?, true),
    };

    let (payload, encrypted) = if options.encrypt {
        let password = options
            .password
            .as_deref()
            .ok_or(CodecError::MissingPassword)?;
        (cipher::encrypt(&payload, password)?, true)
    } else {
        (payload, false)
    };

    let prefix = prefix_for(compressed, encrypted);

    match options.format_version.unwrap_or(FORMAT_VERSION) {
        FORMAT_VERSION_PREFIXED => {
            // Bare form: the prefix is the only flag carrier.
            Ok(format!("{prefix}{}", URL_SAFE_NO_PAD.encode(payload)))
        }
        FORMAT_VERSION => {
            let envelope = Envelope {
                format_version: FORMAT_VERSION,
                data: payload,
                compressed,
                encrypted,
            };
            let body = serde_json::to_string(&envelope)
                .map_err(|e| CodecError::Serialization(e.to_string()))?;
            Ok(format!("{prefix}{}", URL_SAFE_NO_PAD.encode(body)))
        }
        other => Err(CodecError::UnsupportedVersion(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::CompressionAlgorithm;
    use serde_json::json;

    #[test]
    fn plain_token_is_url_safe() {
        let token = encode(&json!({"a": 1}), &EncodeOptions::new()).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn compressed_token_carries_prefix() {
        let value = json!({"blob": "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"});
        let options =
            EncodeOptions::new().with_compress(CompressMode::Force(CompressionAlgorithm::Lz4));
        let token = encode(&value, &options).unwrap();
        assert!(token.starts_with("c_"));
    }

    #[test]
    fn encrypted_token_carries_prefix() {
        let options = EncodeOptions::new().with_encryption("pw");
        let token = encode(&json!({"a": 1}), &options).unwrap();
        assert!(token.starts_with("e_"));
    }

    #[test]
    fn encryption_without_password_fails() {
        let options = EncodeOptions {
            encrypt: true,
            ..Default::default()
        };
        let result = encode(&json!({"a": 1}), &options);
        assert!(matches!(result, Err(CodecError::MissingPassword)));
    }

    #[test]
    fn unknown_version_fails() {
        let options = EncodeOptions::new().with_format_version(7);
        let result = encode(&json!(1), &options);
        assert!(matches!(result, Err(CodecError::UnsupportedVersion(7))));
    }

    #[test]
    fn auto_mode_keeps_small_values_uncompressed() {
        let options = EncodeOptions::new().with_compress(CompressMode::Auto);
        let token = encode(&json!({"a": 1}), &options).unwrap();
        assert!(!token.starts_with("c_"));
    }
}
