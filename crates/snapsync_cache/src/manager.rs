//! The offline cache manager.

use crate::error::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use snapsync_codec::{decode, encode, CompressMode, DecodeOptions, EncodeOptions};
use snapsync_storage::StorageBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A caller-supplied schema gate applied to values on save and load.
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Options for a single save or load.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Time-to-live for the record. `None` falls back to the manager's
    /// default TTL, if any.
    pub ttl: Option<Duration>,
    /// Compression mode for the encoded payload.
    pub compress: CompressMode,
    /// Whether to encrypt the encoded payload.
    pub encrypt: bool,
    /// Password for encryption and decryption.
    pub password: Option<String>,
}

impl CacheOptions {
    /// Creates default options: no TTL override, no compression, no
    /// encryption.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the record TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the compression mode.
    pub fn with_compress(mut self, mode: CompressMode) -> Self {
        self.compress = mode;
        self
    }

    /// Enables encryption with the given password.
    pub fn with_encryption(mut self, password: impl Into<String>) -> Self {
        self.encrypt = true;
        self.password = Some(password.into());
        self
    }

    /// Supplies a password for loading without enabling encryption on
    /// save.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Persists snapshots locally through a storage backend, encoding each
/// value as an envelope token.
///
/// The manager is the only writer of stored records. It owns TTL
/// bookkeeping and understands two stored layouts: the current envelope
/// tokens, and the plain-JSON records written before the envelope
/// scheme existed. Stores are long-lived, so the legacy branch is load
/// behavior, not optional polish.
pub struct CacheManager {
    backend: Arc<dyn StorageBackend>,
    default_ttl: Option<Duration>,
    validator: Option<Validator>,
}

impl CacheManager {
    /// Creates a cache manager on top of a backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            default_ttl: None,
            validator: None,
        }
    }

    /// Sets a default TTL applied when save options carry none.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Installs a validation gate applied to values on save and load.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Saves a value under a key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Validation`] if the validator rejects the
    /// value, and codec or storage errors otherwise.
    pub fn save<T: Serialize>(&self, key: &str, value: &T, options: &CacheOptions) -> CacheResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.save_value(key, &value, options)
    }

    /// Saves an already-converted JSON value under a key.
    ///
    /// # Errors
    ///
    /// Same as [`save`](Self::save).
    pub fn save_value(&self, key: &str, value: &Value, options: &CacheOptions) -> CacheResult<()> {
        self.validate(value)?;

        let encode_options = EncodeOptions {
            compress: options.compress,
            encrypt: options.encrypt,
            password: options.password.clone(),
            format_version: None,
        };
        let token = encode(value, &encode_options)?;

        let ttl = options.ttl.or(self.default_ttl);
        self.backend.set(key, token, ttl)?;
        debug!(key, "saved cache record");
        Ok(())
    }

    /// Loads the value for a key, or `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns codec errors for undecodable records and
    /// [`CacheError::Validation`] if the validator rejects the loaded
    /// value.
    pub fn load<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &CacheOptions,
    ) -> CacheResult<Option<T>> {
        match self.load_value(key, options)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CacheError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Loads the raw JSON value for a key, or `None` if absent or
    /// expired.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_value(&self, key: &str, options: &CacheOptions) -> CacheResult<Option<Value>> {
        let Some(payload) = self.backend.get_payload(key)? else {
            return Ok(None);
        };

        // Records written before the envelope scheme hold plain JSON.
        let value = match serde_json::from_str::<Value>(&payload) {
            Ok(value) => {
                debug!(key, "loaded legacy plain-JSON record");
                value
            }
            Err(_) => {
                let decode_options = DecodeOptions {
                    password: options.password.clone(),
                    strict_version: true,
                };
                decode(&payload, &decode_options)?
            }
        };

        self.validate(&value)?;
        Ok(Some(value))
    }

    /// Deletes the record for a key.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub fn remove(&self, key: &str) -> CacheResult<()> {
        self.backend.delete(key)?;
        Ok(())
    }

    /// Deletes every record in the cache namespace.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub fn clear(&self) -> CacheResult<()> {
        self.backend.clear()?;
        Ok(())
    }

    /// Lists all live cached keys.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub fn list_keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.backend.keys()?)
    }

    fn validate(&self, value: &Value) -> CacheResult<()> {
        if let Some(validator) = &self.validator {
            validator(value).map_err(CacheError::Validation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use snapsync_storage::MemoryBackend;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        theme: String,
        size: u32,
    }

    fn manager() -> CacheManager {
        CacheManager::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn save_load_roundtrip() {
        let cache = manager();
        let settings = Settings {
            theme: "dark".into(),
            size: 14,
        };

        cache.save("settings", &settings, &CacheOptions::new()).unwrap();
        let loaded: Settings = cache
            .load("settings", &CacheOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_missing_returns_none() {
        let cache = manager();
        let loaded: Option<Value> = cache.load_value("missing", &CacheOptions::new()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn encrypted_roundtrip() {
        let cache = manager();
        let options = CacheOptions::new().with_encryption("pw");

        cache.save_value("k", &json!({"secret": 1}), &options).unwrap();
        let loaded = cache.load_value("k", &options).unwrap().unwrap();
        assert_eq!(loaded, json!({"secret": 1}));
    }

    #[test]
    fn encrypted_record_needs_password() {
        let cache = manager();
        cache
            .save_value("k", &json!(1), &CacheOptions::new().with_encryption("pw"))
            .unwrap();

        let result = cache.load_value("k", &CacheOptions::new());
        assert!(matches!(
            result,
            Err(CacheError::Codec(snapsync_codec::CodecError::MissingPassword))
        ));
    }

    #[test]
    fn expired_record_is_absent() {
        let cache = manager();
        let options = CacheOptions::new().with_ttl(Duration::ZERO);

        cache.save_value("k", &json!(1), &options).unwrap();
        assert!(cache.load_value("k", &CacheOptions::new()).unwrap().is_none());
    }

    #[test]
    fn record_with_ttl_is_readable_before_expiry() {
        let cache = manager();
        let options = CacheOptions::new().with_ttl(Duration::from_secs(3600));

        cache.save_value("k", &json!(1), &options).unwrap();
        assert!(cache.load_value("k", &CacheOptions::new()).unwrap().is_some());
    }

    #[test]
    fn record_expires_once_ttl_elapses() {
        let cache = manager();
        let options = CacheOptions::new().with_ttl(Duration::from_millis(20));

        cache.save_value("k", &json!(1), &options).unwrap();
        assert!(cache.load_value("k", &CacheOptions::new()).unwrap().is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.load_value("k", &CacheOptions::new()).unwrap().is_none());
        assert!(cache.list_keys().unwrap().is_empty());
    }

    #[test]
    fn default_ttl_applies_when_options_carry_none() {
        let backend = Arc::new(MemoryBackend::new());
        let cache = CacheManager::new(backend.clone()).with_default_ttl(Duration::from_secs(60));

        cache.save_value("k", &json!(1), &CacheOptions::new()).unwrap();
        let record = backend.get("k").unwrap().unwrap();
        assert!(record.expires_at.is_some());
    }

    #[test]
    fn legacy_plain_json_record_loads() {
        let backend = Arc::new(MemoryBackend::new());
        // A record written before the envelope scheme existed.
        backend
            .set("old", r#"{"migrated":false}"#.into(), None)
            .unwrap();

        let cache = CacheManager::new(backend);
        let loaded = cache.load_value("old", &CacheOptions::new()).unwrap().unwrap();
        assert_eq!(loaded, json!({"migrated": false}));
    }

    #[test]
    fn cache_survives_reopen_on_durable_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let backend = Arc::new(snapsync_storage::FileBackend::open(dir.path()).unwrap());
            let cache = CacheManager::new(backend);
            cache.save_value("k", &json!({"n": 1}), &CacheOptions::new()).unwrap();
        }

        let backend = Arc::new(snapsync_storage::FileBackend::open(dir.path()).unwrap());
        let reopened = CacheManager::new(backend);
        assert_eq!(
            reopened.load_value("k", &CacheOptions::new()).unwrap(),
            Some(json!({"n": 1}))
        );
    }

    #[test]
    fn validator_rejects_bad_values() {
        let cache = manager().with_validator(Arc::new(|value| {
            value
                .get("id")
                .map(|_| ())
                .ok_or_else(|| "missing field `id`".to_string())
        }));

        let result = cache.save_value("k", &json!({"name": "x"}), &CacheOptions::new());
        assert!(matches!(result, Err(CacheError::Validation(_))));

        cache
            .save_value("k", &json!({"id": 1}), &CacheOptions::new())
            .unwrap();
    }

    #[test]
    fn clear_and_list_keys() {
        let cache = manager();
        cache.save_value("a", &json!(1), &CacheOptions::new()).unwrap();
        cache.save_value("b", &json!(2), &CacheOptions::new()).unwrap();

        let mut keys = cache.list_keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        cache.remove("a").unwrap();
        assert_eq!(cache.list_keys().unwrap(), vec!["b".to_string()]);

        cache.clear().unwrap();
        assert!(cache.list_keys().unwrap().is_empty());
    }
}
