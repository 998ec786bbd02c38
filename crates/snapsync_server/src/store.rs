//! Server-side per-store snapshot state.

use parking_lot::RwLock;
use std::collections::HashMap;

/// What the server holds for one logical store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    /// The current encoded token.
    pub token: String,
    /// Snapshot timestamp, epoch millis.
    pub timestamp: u64,
    /// Snapshot version.
    pub version: u64,
    /// Client that last wrote the store.
    pub client_id: String,
}

/// Registry of all store states, shared across handlers.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    stores: RwLock<HashMap<String, StoredSnapshot>>,
}

impl StoreRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored snapshot for a store, if any.
    pub fn get(&self, store_id: &str) -> Option<StoredSnapshot> {
        self.stores.read().get(store_id).cloned()
    }

    /// Replaces the stored snapshot for a store.
    pub fn put(&self, store_id: &str, snapshot: StoredSnapshot) {
        self.stores.write().insert(store_id.to_string(), snapshot);
    }

    /// Removes a store.
    pub fn remove(&self, store_id: &str) {
        self.stores.write().remove(store_id);
    }

    /// Returns the number of stores with state.
    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    /// Returns true if no store has state.
    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }
}
