//! Password-based authenticated encryption for token payloads.
//!
//! Keys are derived from passwords with PBKDF2-HMAC-SHA256 at a high
//! iteration count and fed into AES-256-GCM with a random per-call
//! nonce. The output embeds `salt || nonce || ciphertext`, so decryption
//! is self-describing given only the password. A wrong password fails
//! deterministically on the authentication tag; garbage is never
//! returned.

use crate::error::{CodecError, CodecResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the derived AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the PBKDF2 salt in bytes.
pub const SALT_SIZE: usize = 16;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;
/// PBKDF2 iteration count for password-derived keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// A derived encryption key, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Derives a key from a password and salt.
    fn derive(password: &str, salt: &[u8]) -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut bytes);
        Self { bytes }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.bytes))
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypts text with a password.
///
/// The result is URL-safe base64 of `salt || nonce || ciphertext`.
pub fn encrypt(plaintext: &str, password: &str) -> CodecResult<String> {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let key = DerivedKey::derive(password, &salt);
    let ciphertext = key
        .cipher()
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CodecError::DecryptionFailed("encryption error".into()))?;

    let mut out = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend(ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(out))
}

/// Decrypts text produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CodecError::DecryptionFailed`] if the text is not a valid
/// cipher payload, the password is wrong, or the payload was tampered
/// with.
pub fn decrypt(payload: &str, password: &str) -> CodecResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CodecError::DecryptionFailed(format!("invalid encoding: {e}")))?;

    if bytes.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
        return Err(CodecError::DecryptionFailed("payload too short".into()));
    }

    let (salt, rest) = bytes.split_at(SALT_SIZE);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let key = DerivedKey::derive(password, salt);
    let plaintext = key
        .cipher()
        .decrypt(nonce, ciphertext)
        .map_err(|_| CodecError::DecryptionFailed("authentication failed".into()))?;

    String::from_utf8(plaintext)
        .map_err(|e| CodecError::DecryptionFailed(format!("invalid UTF-8: {e}")))
}
