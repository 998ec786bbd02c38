//! # snapsync cache
//!
//! The offline cache manager: persists snapshots locally with TTL,
//! delegating encoding (and optional compression/encryption) to the
//! envelope codec and byte storage to a pluggable storage backend.
//!
//! ## Example
//!
//! ```rust
//! use snapsync_cache::{CacheManager, CacheOptions};
//! use snapsync_storage::MemoryBackend;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let cache = CacheManager::new(Arc::new(MemoryBackend::new()));
//! cache.save_value("settings", &json!({"theme": "dark"}), &CacheOptions::new()).unwrap();
//!
//! let loaded = cache.load_value("settings", &CacheOptions::new()).unwrap();
//! assert_eq!(loaded, Some(json!({"theme": "dark"})));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod manager;

pub use error::{CacheError, CacheResult};
pub use manager::{CacheManager, CacheOptions, Validator};
