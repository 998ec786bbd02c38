//! Storage backend trait definition.

use crate::error::StorageResult;
use crate::record::StoredRecord;
use std::time::Duration;

/// The fixed prefix every backend prepends to caller keys.
///
/// Backends may share a physical store with unrelated data; the
/// namespace keeps snapsync records from colliding with it.
pub const KEY_NAMESPACE: &str = "snapsync";

/// Prepends the namespace to a caller key.
pub fn namespaced(key: &str) -> String {
    format!("{KEY_NAMESPACE}:{key}")
}

/// Strips the namespace from a physical key, if present.
pub fn strip_namespace(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_NAMESPACE)?.strip_prefix(':')
}

/// A key/value storage backend with TTL support.
///
/// Backends are opaque payload stores: they hold text records keyed by
/// namespaced strings and do not interpret the payloads.
///
/// # Invariants
///
/// - `get` returns exactly the record previously written for the key
/// - A record whose expiry has passed is absent to `get` and `keys`,
///   and `get` deletes it opportunistically
/// - All keys are namespaced with [`KEY_NAMESPACE`]; `keys` reports
///   caller keys with the namespace stripped
/// - Backends must be `Send + Sync`; the pinned default backend is
///   shared across store instances
///
/// # Implementors
///
/// - [`super::IndexedBackend`] - durable, log-structured with an index
/// - [`super::FileBackend`] - durable, one file per record
/// - [`super::MemoryBackend`] - ephemeral, for tests and fallback
pub trait StorageBackend: Send + Sync {
    /// A short human-readable backend name, used in probe logging.
    fn name(&self) -> &'static str;

    /// Reads the record for a key.
    ///
    /// Expired records are deleted and reported absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn get(&self, key: &str) -> StorageResult<Option<StoredRecord>>;

    /// Writes a payload for a key, with an optional TTL.
    ///
    /// Overwrites any existing record for the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn set(&self, key: &str, payload: String, ttl: Option<Duration>) -> StorageResult<()>;

    /// Deletes the record for a key. Deleting an absent key is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Deletes every record in the namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn clear(&self) -> StorageResult<()>;

    /// Lists all live (non-expired) caller keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Convenience: reads just the payload for a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn get_payload(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.get(key)?.map(|record| record.payload))
    }
}
