//! Fallback chain: probe candidates, pin the first healthy backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::file::FileBackend;
use crate::indexed::IndexedBackend;
use crate::memory::MemoryBackend;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key used for probe round-trips. Lives in the normal namespace and is
/// deleted by the probe itself.
const PROBE_KEY: &str = "__probe__";
const PROBE_PAYLOAD: &str = "probe";

/// Probes a backend with a harmless set/get/delete round-trip.
fn probe(backend: &dyn StorageBackend) -> StorageResult<()> {
    backend.set(PROBE_KEY, PROBE_PAYLOAD.into(), None)?;
    let read = backend.get(PROBE_KEY)?;
    backend.delete(PROBE_KEY)?;

    match read {
        Some(record) if record.payload == PROBE_PAYLOAD => Ok(()),
        _ => Err(StorageError::Corrupted(
            "probe read back a different payload".into(),
        )),
    }
}

/// Probes candidates in order and returns the first healthy backend.
///
/// Candidates should be ordered most to least capable. Probe failures
/// are logged and the next candidate is tried; the chain guarantees the
/// system degrades rather than fails outright.
///
/// # Errors
///
/// Returns [`StorageError::Unavailable`] if every candidate fails.
pub fn select_backend(
    candidates: Vec<Arc<dyn StorageBackend>>,
) -> StorageResult<Arc<dyn StorageBackend>> {
    for backend in candidates {
        match probe(backend.as_ref()) {
            Ok(()) => {
                debug!(backend = backend.name(), "selected storage backend");
                return Ok(backend);
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "storage backend failed probe");
            }
        }
    }
    Err(StorageError::Unavailable)
}

/// Builds the default candidate chain rooted at a directory:
/// indexed log store, then per-file store, then in-memory.
///
/// Backends that fail to open are skipped here and logged; the in-memory
/// floor always opens.
pub fn default_chain(base_dir: &Path) -> Vec<Arc<dyn StorageBackend>> {
    let mut candidates: Vec<Arc<dyn StorageBackend>> = Vec::with_capacity(3);

    match IndexedBackend::open(&base_dir.join("indexed")) {
        Ok(backend) => candidates.push(Arc::new(backend)),
        Err(e) => warn!(error = %e, "indexed backend unavailable"),
    }
    match FileBackend::open(&base_dir.join("records")) {
        Ok(backend) => candidates.push(Arc::new(backend)),
        Err(e) => warn!(error = %e, "file backend unavailable"),
    }
    candidates.push(Arc::new(MemoryBackend::new()));

    candidates
}

static PINNED: RwLock<Option<Arc<dyn StorageBackend>>> = RwLock::new(None);

/// The process-wide cache of the fallback-chain selection.
///
/// Repeated probing on every operation would be wasteful, so the first
/// successful selection is pinned for the process lifetime (or until
/// [`reset`](PinnedBackend::reset)). All operations are safe to call
/// concurrently from multiple store instances.
pub struct PinnedBackend;

impl PinnedBackend {
    /// Returns the pinned backend, if one has been selected.
    pub fn get() -> Option<Arc<dyn StorageBackend>> {
        PINNED.read().clone()
    }

    /// Pins a backend explicitly, replacing any prior selection.
    pub fn pin(backend: Arc<dyn StorageBackend>) {
        *PINNED.write() = Some(backend);
    }

    /// Returns the pinned backend, running selection over the given
    /// candidates first if none is pinned yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if selection runs and every
    /// candidate fails.
    pub fn get_or_select(
        candidates: Vec<Arc<dyn StorageBackend>>,
    ) -> StorageResult<Arc<dyn StorageBackend>> {
        // Double-checked under the write lock so concurrent first calls
        // probe at most once each and agree on the winner.
        if let Some(backend) = PINNED.read().clone() {
            return Ok(backend);
        }
        let mut slot = PINNED.write();
        if let Some(backend) = slot.clone() {
            return Ok(backend);
        }
        let selected = select_backend(candidates)?;
        *slot = Some(Arc::clone(&selected));
        Ok(selected)
    }

    /// Clears the pinned selection.
    pub fn reset() {
        *PINNED.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StoredRecord;
    use std::time::Duration;

    /// A backend whose every operation fails.
    struct BrokenBackend;

    impl StorageBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn get(&self, _key: &str) -> StorageResult<Option<StoredRecord>> {
            Err(StorageError::Corrupted("broken".into()))
        }
        fn set(&self, _key: &str, _payload: String, _ttl: Option<Duration>) -> StorageResult<()> {
            Err(StorageError::Corrupted("broken".into()))
        }
        fn delete(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Corrupted("broken".into()))
        }
        fn clear(&self) -> StorageResult<()> {
            Err(StorageError::Corrupted("broken".into()))
        }
        fn keys(&self) -> StorageResult<Vec<String>> {
            Err(StorageError::Corrupted("broken".into()))
        }
    }

    #[test]
    fn selects_first_healthy_backend() {
        let selected = select_backend(vec![
            Arc::new(BrokenBackend),
            Arc::new(MemoryBackend::new()),
        ])
        .unwrap();
        assert_eq!(selected.name(), "memory");

        // Subsequent operations route to the fallback without error.
        selected.set("k", "v".into(), None).unwrap();
        assert_eq!(selected.get_payload("k").unwrap().unwrap(), "v");
    }

    #[test]
    fn exhausted_chain_is_unavailable() {
        let result = select_backend(vec![Arc::new(BrokenBackend), Arc::new(BrokenBackend)]);
        assert!(matches!(result, Err(StorageError::Unavailable)));
    }

    #[test]
    fn probe_cleans_up_after_itself() {
        let backend = MemoryBackend::new();
        probe(&backend).unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn default_chain_ends_with_memory_floor() {
        let dir = tempfile::TempDir::new().unwrap();
        let chain = default_chain(dir.path());
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.last().unwrap().name(), "memory");
        assert_eq!(chain[0].name(), "indexed");
    }

    #[test]
    fn pinned_backend_round_trip() {
        PinnedBackend::reset();
        assert!(PinnedBackend::get().is_none());

        let selected =
            PinnedBackend::get_or_select(vec![Arc::new(MemoryBackend::new())]).unwrap();
        assert_eq!(selected.name(), "memory");
        assert!(PinnedBackend::get().is_some());

        // A second call reuses the pin without re-probing candidates.
        let again = PinnedBackend::get_or_select(vec![Arc::new(BrokenBackend)]).unwrap();
        assert_eq!(again.name(), "memory");

        PinnedBackend::reset();
        assert!(PinnedBackend::get().is_none());
    }
}
