//! Connectivity observation.
//!
//! The watcher is the seam between platform connectivity notifications
//! and the engine: the host environment calls
//! [`set_online`](ConnectivityWatcher::set_online) when its network
//! state changes, and registered listeners observe the transitions.

use crate::events::{ListenerHandle, ListenerSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// The network became reachable.
    Online,
    /// The network became unreachable.
    Offline,
}

/// Tracks online/offline state and notifies listeners of transitions.
///
/// Listeners are invoked synchronously in registration order, only on
/// actual transitions; redundant `set_online` calls are ignored.
pub struct ConnectivityWatcher {
    online: AtomicBool,
    listeners: ListenerSet<ConnectivityEvent>,
}

impl ConnectivityWatcher {
    /// Creates a watcher with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
            listeners: ListenerSet::new(),
        }
    }

    /// Returns the current connectivity state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records a connectivity change, notifying listeners on transition.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }
        let event = if online {
            ConnectivityEvent::Online
        } else {
            ConnectivityEvent::Offline
        };
        tracing::debug!(?event, "connectivity changed");
        self.listeners.emit(&event);
    }

    /// Registers a transition listener and returns its unregister
    /// handle.
    pub fn register(
        &self,
        listener: impl Fn(&ConnectivityEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.listeners.register(listener)
    }
}

impl Default for ConnectivityWatcher {
    fn default() -> Self {
        Self::new(true)
    }
}
