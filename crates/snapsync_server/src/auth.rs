//! Authentication support for the sync server.
//!
//! Token-based authentication using HMAC-SHA256. Tokens bind a client
//! to a store and carry a timestamp for expiration checking.
//!
//! ## Token Format
//!
//! The signed message is `client_id\n store_id\n timestamp` (newline
//! separated, timestamp as Unix millis in decimal), followed by the
//! 32-byte HMAC-SHA256 signature. The whole token is URL-safe base64
//! for transport.

use crate::error::{ServerError, ServerResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_SIZE: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// Token expiration duration.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates a new auth configuration.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_expiry: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Sets the token expiration duration.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

/// Claims carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// The authenticated client.
    pub client_id: String,
    /// The store the token grants access to.
    pub store_id: String,
    /// Issue time, Unix millis.
    pub issued_at: u64,
}

/// Token validator for incoming requests.
#[derive(Clone)]
pub struct TokenValidator {
    config: AuthConfig,
}

impl TokenValidator {
    /// Creates a new token validator.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Creates a new auth token for a client and store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured secret is unusable.
    pub fn create_token(&self, client_id: &str, store_id: &str) -> ServerResult<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.create_token_at(client_id, store_id, timestamp)
    }

    fn create_token_at(
        &self,
        client_id: &str,
        store_id: &str,
        timestamp: u64,
    ) -> ServerResult<String> {
        let message = format!("{client_id}\n{store_id}\n{timestamp}");
        let signature = self.sign(message.as_bytes())?;

        let mut token = Vec::with_capacity(message.len() + SIGNATURE_SIZE);
        token.extend_from_slice(message.as_bytes());
        token.extend_from_slice(&signature);
        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AuthenticationFailed`] for malformed,
    /// tampered or expired tokens. Signature comparison is constant
    /// time.
    pub fn verify_token(&self, token: &str) -> ServerResult<TokenClaims> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ServerError::AuthenticationFailed("bad token encoding".into()))?;

        if bytes.len() <= SIGNATURE_SIZE {
            return Err(ServerError::AuthenticationFailed("token too short".into()));
        }
        let (message, signature) = bytes.split_at(bytes.len() - SIGNATURE_SIZE);

        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|_| ServerError::AuthenticationFailed("bad secret".into()))?;
        mac.update(message);
        mac.verify_slice(signature)
            .map_err(|_| ServerError::AuthenticationFailed("bad signature".into()))?;

        let message = std::str::from_utf8(message)
            .map_err(|_| ServerError::AuthenticationFailed("bad token body".into()))?;
        let mut parts = message.split('\n');
        let (Some(client_id), Some(store_id), Some(timestamp), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ServerError::AuthenticationFailed("bad token body".into()));
        };
        let issued_at: u64 = timestamp
            .parse()
            .map_err(|_| ServerError::AuthenticationFailed("bad timestamp".into()))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let expiry_millis = self.config.token_expiry.as_millis() as u64;
        if now.saturating_sub(issued_at) > expiry_millis {
            return Err(ServerError::AuthenticationFailed("token expired".into()));
        }

        Ok(TokenClaims {
            client_id: client_id.to_string(),
            store_id: store_id.to_string(),
            issued_at,
        })
    }

    fn sign(&self, message: &[u8]) -> ServerResult<[u8; SIGNATURE_SIZE]> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|_| ServerError::AuthenticationFailed("bad secret".into()))?;
        mac.update(message);
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(&mac.finalize().into_bytes());
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> TokenValidator {
        TokenValidator::new(AuthConfig::new(b"test-secret".to_vec()))
    }

    #[test]
    fn token_roundtrip() {
        let validator = validator();
        let token = validator.create_token("client-1", "notes").unwrap();

        let claims = validator.verify_token(&token).unwrap();
        assert_eq!(claims.client_id, "client-1");
        assert_eq!(claims.store_id, "notes");
    }

    #[test]
    fn wrong_secret_fails() {
        let token = validator().create_token("client-1", "notes").unwrap();
        let other = TokenValidator::new(AuthConfig::new(b"other-secret".to_vec()));

        assert!(matches!(
            other.verify_token(&token),
            Err(ServerError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn tampered_token_fails() {
        let validator = validator();
        let token = validator.create_token("client-1", "notes").unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        bytes[0] ^= 0xFF;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert!(validator.verify_token(&tampered).is_err());
    }

    #[test]
    fn expired_token_fails() {
        let config = AuthConfig::new(b"s".to_vec()).with_expiry(Duration::from_millis(10));
        let validator = TokenValidator::new(config);

        let old = validator.create_token_at("c", "s", 1_000).unwrap();
        assert!(matches!(
            validator.verify_token(&old),
            Err(ServerError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn garbage_token_fails() {
        assert!(validator().verify_token("!!!").is_err());
        assert!(validator().verify_token("").is_err());
    }
}
