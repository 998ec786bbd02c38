//! # snapsync storage
//!
//! Key/value storage backends with TTL for snapsync.
//!
//! Backends hold opaque text payloads under namespaced keys and know
//! nothing about envelopes or snapshots. Three interchangeable
//! implementations are composed into a fallback chain: candidates are
//! probed most-capable-first with a harmless round-trip, and the first
//! healthy one is pinned process-wide.
//!
//! ## Available Backends
//!
//! - [`IndexedBackend`] - durable, log-structured with an in-memory index
//! - [`FileBackend`] - durable, one JSON file per record
//! - [`MemoryBackend`] - ephemeral floor of the chain, and for tests
//!
//! ## Example
//!
//! ```rust
//! use snapsync_storage::{MemoryBackend, StorageBackend};
//! use std::time::Duration;
//!
//! let backend = MemoryBackend::new();
//! backend.set("store-1", "payload".into(), Some(Duration::from_secs(60))).unwrap();
//! assert_eq!(backend.get_payload("store-1").unwrap().unwrap(), "payload");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod chain;
mod error;
mod file;
mod indexed;
mod memory;
mod record;

pub use backend::{namespaced, strip_namespace, StorageBackend, KEY_NAMESPACE};
pub use chain::{default_chain, select_backend, PinnedBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use indexed::IndexedBackend;
pub use memory::MemoryBackend;
pub use record::{now_millis, StoredRecord};
