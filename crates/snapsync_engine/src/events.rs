//! Event listeners: registration contract and sync events.
//!
//! Listener registration returns an unregister handle. Listeners are
//! invoked synchronously in registration order, and the emitter holds
//! no assumptions about listener side effects.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;
type Registry<E> = RwLock<Vec<(u64, Callback<E>)>>;

/// An ordered set of event listeners.
pub struct ListenerSet<E> {
    registry: Arc<Registry<E>>,
    next_id: AtomicU64,
}

impl<E: 'static> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> ListenerSet<E> {
    /// Creates an empty listener set.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a listener and returns its unregister handle.
    pub fn register(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.registry.write().push((id, Arc::new(listener)));

        let registry = Arc::downgrade(&self.registry);
        ListenerHandle {
            unregister: Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.write().retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    /// Invokes every listener with the event, in registration order.
    ///
    /// The registry lock is not held during invocation, so listeners
    /// may register or unregister from within a callback.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Callback<E>> = self
            .registry
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    /// Returns true if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }
}

/// Handle returned by [`ListenerSet::register`].
///
/// Dropping the handle does not unregister the listener; call
/// [`unregister`](ListenerHandle::unregister) explicitly.
pub struct ListenerHandle {
    unregister: Box<dyn FnOnce() + Send>,
}

impl ListenerHandle {
    /// Removes the listener from its set.
    pub fn unregister(self) {
        (self.unregister)();
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ListenerHandle")
    }
}

/// Events emitted by the sync engine.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A sync cycle started.
    SyncStarted,
    /// A sync cycle finished successfully.
    SyncCompleted {
        /// Queued items delivered during the cycle.
        flushed: usize,
        /// Whether a conflict was resolved during the cycle.
        conflict_resolved: bool,
    },
    /// Divergent snapshots were reconciled.
    Conflict {
        /// The client state before resolution.
        client: Value,
        /// The server state before resolution.
        server: Value,
        /// The resolved state.
        resolved: Value,
    },
    /// Connectivity was lost.
    Offline,
    /// Connectivity was restored.
    Online,
    /// A sync-cycle error was caught.
    Error {
        /// Error message.
        message: String,
    },
}
