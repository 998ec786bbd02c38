//! In-memory storage backend.

use crate::backend::{namespaced, strip_namespace, StorageBackend};
use crate::error::StorageResult;
use crate::record::StoredRecord;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// An in-memory storage backend.
///
/// The least capable tier of the fallback chain: nothing survives the
/// process, but it can never fail a probe. Also the backend of choice
/// for unit tests.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records currently held, expired or not.
    ///
    /// Useful for testing opportunistic expiry deletion.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> StorageResult<Option<StoredRecord>> {
        let physical = namespaced(key);
        let record = self.records.read().get(&physical).cloned();

        match record {
            Some(record) if record.is_expired() => {
                self.records.write().remove(&physical);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn set(&self, key: &str, payload: String, ttl: Option<Duration>) -> StorageResult<()> {
        self.records
            .write()
            .insert(namespaced(key), StoredRecord::new(payload, ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.records.write().remove(&namespaced(key));
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.records.write().clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|(_, record)| !record.is_expired())
            .filter_map(|(key, _)| strip_namespace(key).map(String::from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_set_get_roundtrip() {
        let backend = MemoryBackend::new();
        backend.set("k", "v".into(), None).unwrap();

        let record = backend.get("k").unwrap().unwrap();
        assert_eq!(record.payload, "v");
        assert_eq!(record.expires_at, None);
    }

    #[test]
    fn memory_get_missing_returns_none() {
        let backend = MemoryBackend::new();
        assert!(backend.get("missing").unwrap().is_none());
    }

    #[test]
    fn memory_overwrite_replaces_record() {
        let backend = MemoryBackend::new();
        backend.set("k", "old".into(), None).unwrap();
        backend.set("k", "new".into(), None).unwrap();
        assert_eq!(backend.get_payload("k").unwrap().unwrap(), "new");
    }

    #[test]
    fn memory_delete_removes_record() {
        let backend = MemoryBackend::new();
        backend.set("k", "v".into(), None).unwrap();
        backend.delete("k").unwrap();
        assert!(backend.get("k").unwrap().is_none());
    }

    #[test]
    fn memory_delete_missing_is_ok() {
        let backend = MemoryBackend::new();
        assert!(backend.delete("missing").is_ok());
    }

    #[test]
    fn memory_clear_removes_everything() {
        let backend = MemoryBackend::new();
        backend.set("a", "1".into(), None).unwrap();
        backend.set("b", "2".into(), None).unwrap();
        backend.clear().unwrap();
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn memory_expired_record_is_absent_and_deleted() {
        let backend = MemoryBackend::new();
        backend.set("k", "v".into(), Some(Duration::ZERO)).unwrap();

        assert_eq!(backend.len(), 1);
        assert!(backend.get("k").unwrap().is_none());
        // Opportunistic deletion on read.
        assert_eq!(backend.len(), 0);
    }

    #[test]
    fn memory_keys_skip_expired_records() {
        let backend = MemoryBackend::new();
        backend.set("live", "1".into(), None).unwrap();
        backend.set("dead", "2".into(), Some(Duration::ZERO)).unwrap();

        assert_eq!(backend.keys().unwrap(), vec!["live".to_string()]);
    }

    #[test]
    fn memory_record_with_ttl_is_readable_before_expiry() {
        let backend = MemoryBackend::new();
        backend
            .set("k", "v".into(), Some(Duration::from_secs(3600)))
            .unwrap();
        assert!(backend.get("k").unwrap().is_some());
    }
}
