//! Token decoding: envelope → decrypt → decompress → value.

use crate::cipher;
use crate::compress::{self, CompressionAlgorithm};
use crate::envelope::{
    is_supported_version, strip_prefix, DecodeOptions, Envelope, FORMAT_VERSION_PREFIXED,
};
use crate::error::{CodecError, CodecResult};
use crate::json::repair_near_json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Decodes a token produced by [`encode`](crate::encode).
///
/// Both the wrapped-object form and the bare prefix form are accepted.
/// Decryption runs before decompression, mirroring encode order in
/// reverse. With `strict_version` unset, tokens from peers with unknown
/// capabilities go through an ordered list of best-effort payload
/// interpretations; the authentication tag of encrypted payloads is
/// never bypassed.
pub fn decode(token: &str, options: &DecodeOptions) -> CodecResult<Value> {
    if token.is_empty() {
        return Err(CodecError::malformed("empty token"));
    }

    let (hint, body) = strip_prefix(token);
    let bytes = URL_SAFE_NO_PAD
        .decode(body.trim_end_matches('='))
        .map_err(|e| CodecError::MalformedToken(format!("invalid base64: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| CodecError::malformed("token does not decode to text"))?;

    // Wrapped-object form first; anything else is the bare prefix form,
    // whose only flag carrier is the prefix itself.
    let envelope = match serde_json::from_str::<Envelope>(&text) {
        Ok(envelope) => envelope,
        Err(_) => Envelope {
            format_version: FORMAT_VERSION_PREFIXED,
            data: text,
            compressed: hint.compressed,
            encrypted: hint.encrypted,
        },
    };

    if options.strict_version && !is_supported_version(envelope.format_version) {
        return Err(CodecError::UnsupportedVersion(envelope.format_version));
    }

    let payload = if envelope.encrypted {
        let password = options
            .password
            .as_deref()
            .ok_or(CodecError::MissingPassword)?;
        cipher::decrypt(&envelope.data, password)?
    } else {
        envelope.data
    };

    if options.strict_version {
        decode_payload_strict(&payload, envelope.compressed)
    } else {
        decode_payload_lenient(&payload, envelope.compressed, options.password.as_deref())
    }
}

/// Decodes a payload whose flags are trusted.
fn decode_payload_strict(payload: &str, compressed: bool) -> CodecResult<Value> {
    let json = if compressed {
        compress::decompress(payload, None)?
    } else {
        payload.to_string()
    };

    serde_json::from_str(&json).map_err(|e| CodecError::MalformedToken(format!("bad payload: {e}")))
}

/// Decodes a payload whose flags may be wrong or missing.
///
/// Strategies are tried in a fixed order with a well-defined success
/// criterion (the result parses as JSON): the payload as-is, each known
/// compression algorithm, a decryption pass when a password is at hand,
/// and finally heuristic repair of near-JSON text.
fn decode_payload_lenient(
    payload: &str,
    compressed: bool,
    password: Option<&str>,
) -> CodecResult<Value> {
    if let Ok(value) = serde_json::from_str(payload) {
        return Ok(value);
    }

    for algorithm in CompressionAlgorithm::ALL {
        if let Ok(json) = compress::decompress(payload, Some(algorithm)) {
            if let Ok(value) = serde_json::from_str(&json) {
                return Ok(value);
            }
        }
    }

    if let Some(password) = password {
        if let Ok(inner) = cipher::decrypt(payload, password) {
            if let Ok(value) = serde_json::from_str(&inner) {
                return Ok(value);
            }
            for algorithm in CompressionAlgorithm::ALL {
                if let Ok(json) = compress::decompress(&inner, Some(algorithm)) {
                    if let Ok(value) = serde_json::from_str(&json) {
                        return Ok(value);
                    }
                }
            }
        }
    }

    if let Some(value) = repair_near_json(payload) {
        return Ok(value);
    }

    if compressed {
        Err(CodecError::DecompressionFailed(
            "no decode strategy produced valid JSON".into(),
        ))
    } else {
        Err(CodecError::malformed(
            "no decode strategy produced valid JSON",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::CompressMode;
    use crate::encoder::encode;
    use crate::envelope::EncodeOptions;
    use serde_json::json;

    #[test]
    fn roundtrip_plain() {
        let value = json!({"a": 1, "b": [1, 2, 3]});
        let token = encode(&value, &EncodeOptions::new()).unwrap();
        assert_eq!(decode(&token, &DecodeOptions::new()).unwrap(), value);
    }

    #[test]
    fn roundtrip_compressed() {
        let value = json!({"text": "the quick brown fox jumps over the lazy dog, repeatedly, \
                            the quick brown fox jumps over the lazy dog"});
        let options = EncodeOptions::new().with_compress(CompressMode::Auto);
        let token = encode(&value, &options).unwrap();
        assert_eq!(decode(&token, &DecodeOptions::new()).unwrap(), value);
    }

    #[test]
    fn roundtrip_encrypted() {
        let value = json!({"secret": true});
        let token = encode(&value, &EncodeOptions::new().with_encryption("pw")).unwrap();
        let decoded = decode(&token, &DecodeOptions::new().with_password("pw")).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn roundtrip_compressed_and_encrypted() {
        let value = json!({"payload": "x".repeat(2048)});
        let options = EncodeOptions::new()
            .with_compress(CompressMode::Auto)
            .with_encryption("pw");
        let token = encode(&value, &options).unwrap();
        assert!(token.starts_with("ec_"));

        let decoded = decode(&token, &DecodeOptions::new().with_password("pw")).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn roundtrip_legacy_prefix_form() {
        let value = json!({"legacy": 1});
        let options = EncodeOptions::new().with_format_version(1);
        let token = encode(&value, &options).unwrap();
        assert_eq!(decode(&token, &DecodeOptions::new()).unwrap(), value);
    }

    #[test]
    fn legacy_prefix_form_encrypted() {
        let value = json!({"legacy": "secret"});
        let options = EncodeOptions::new()
            .with_format_version(1)
            .with_encryption("pw");
        let token = encode(&value, &options).unwrap();
        assert!(token.starts_with("e_"));

        let decoded = decode(&token, &DecodeOptions::new().with_password("pw")).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn wrong_password_fails() {
        let token = encode(&json!({"a": 1}), &EncodeOptions::new().with_encryption("p")).unwrap();
        let result = decode(&token, &DecodeOptions::new().with_password("q"));
        assert!(matches!(result, Err(CodecError::DecryptionFailed(_))));
    }

    #[test]
    fn missing_password_fails() {
        let token = encode(&json!({"a": 1}), &EncodeOptions::new().with_encryption("p")).unwrap();
        let result = decode(&token, &DecodeOptions::new());
        assert!(matches!(result, Err(CodecError::MissingPassword)));
    }

    #[test]
    fn wrong_password_fails_even_lenient() {
        let token = encode(&json!({"a": 1}), &EncodeOptions::new().with_encryption("p")).unwrap();
        let result = decode(&token, &DecodeOptions::new().lenient().with_password("q"));
        // The auth tag is checked; lenient mode never returns garbage.
        assert!(result.is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        let result = decode("!!!not-base64!!!", &DecodeOptions::new());
        assert!(matches!(result, Err(CodecError::MalformedToken(_))));
    }

    #[test]
    fn padded_tokens_are_accepted() {
        let value = json!({"a": 1});
        let token = format!("{}==", encode(&value, &EncodeOptions::new()).unwrap());
        assert_eq!(decode(&token, &DecodeOptions::new()).unwrap(), value);
    }

    #[test]
    fn lenient_mode_repairs_near_json() {
        // A foreign peer produced a bare token with sloppy JSON inside.
        let sloppy = URL_SAFE_NO_PAD.encode("{'count': 3,}");
        let result = decode(&sloppy, &DecodeOptions::new().lenient()).unwrap();
        assert_eq!(result, json!({"count": 3}));
    }

    #[test]
    fn lenient_mode_detects_unflagged_compression() {
        // Compressed payload in a bare token without the c_ prefix.
        let json = json!({"k": "v".repeat(512)}).to_string();
        let compressed = compress::compress(&json, CompressionAlgorithm::Lz4).unwrap();
        let token = URL_SAFE_NO_PAD.encode(&compressed);

        let decoded = decode(&token, &DecodeOptions::new().lenient()).unwrap();
        assert_eq!(decoded, serde_json::from_str::<Value>(&json).unwrap());
    }

    #[test]
    fn strict_mode_rejects_unknown_version() {
        let envelope = json!({
            "formatVersion": 9,
            "data": "{}",
            "compressed": false,
            "encrypted": false,
        });
        let token = URL_SAFE_NO_PAD.encode(envelope.to_string());

        let result = decode(&token, &DecodeOptions::new());
        assert!(matches!(result, Err(CodecError::UnsupportedVersion(9))));

        // Best-effort decode still works for the same token.
        let value = decode(&token, &DecodeOptions::new().lenient()).unwrap();
        assert_eq!(value, json!({}));
    }
}
