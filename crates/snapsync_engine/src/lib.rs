//! # snapsync engine
//!
//! The offline-first sync engine: owns one logical store's snapshot
//! lifecycle across network state transitions.
//!
//! This crate provides:
//! - Sync state machine (idle → syncing → retry-wait)
//! - Offline pending queue flushed on reconnect
//! - Checksum-based change detection and pluggable conflict resolution
//! - Retry with exponential backoff
//! - Connectivity observation with a reconnect settle delay
//! - Periodic auto-sync with a stoppable timer handle
//! - HTTP transport abstraction
//!
//! ## Key Invariants
//!
//! - Every local save lands in the offline cache before any network
//!   activity
//! - Push failures never surface to the `save` caller; they become
//!   queued items and error events
//! - Each queued upload produces exactly one push when connectivity
//!   returns
//! - Sync-cycle network errors are retried with backoff, then surfaced
//!   through the error event; they never crash the host process
//!
//! ## Example
//!
//! ```rust
//! use snapsync_engine::{ConnectivityWatcher, MockTransport, SyncConfig, SyncEngine};
//! use snapsync_cache::CacheManager;
//! use snapsync_storage::MemoryBackend;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let config = SyncConfig::new("notes", "https://sync.example.com");
//! let cache = CacheManager::new(Arc::new(MemoryBackend::new()));
//! let watcher = Arc::new(ConnectivityWatcher::new(true));
//!
//! let engine = SyncEngine::new(config, MockTransport::new(), cache, watcher).unwrap();
//! engine.save(&json!({"count": 1})).unwrap();
//! engine.sync().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod error;
mod events;
mod http;
mod state;
mod timer;
mod transport;

pub use config::{RetryConfig, SyncConfig};
pub use connectivity::{ConnectivityEvent, ConnectivityWatcher};
pub use error::{SyncError, SyncResult};
pub use events::{ListenerHandle, ListenerSet, SyncEvent};
pub use http::{HttpClient, HttpResponse, HttpTransport};
pub use state::{SyncCycleReport, SyncEngine, SyncState, SyncStats, SyncStatus};
pub use timer::AutoSync;
pub use transport::{MockTransport, SyncTransport};
