//! Transport layer abstraction for the two sync verbs.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use snapsync_protocol::{PushRequest, PushResponse};
use std::sync::atomic::{AtomicU32, Ordering};

/// Network access for a logical store's endpoint.
///
/// Two verbs: fetch returns the current server-side encoded token (or
/// `None` if the store is empty), push uploads a token with its
/// snapshot metadata. Implementations decide the actual wire protocol;
/// [`HttpTransport`](crate::HttpTransport) maps the verbs onto GET and
/// POST.
pub trait SyncTransport: Send + Sync {
    /// Fetches the current server-side token for a store.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Network`] on transport failure.
    fn fetch(&self, store_id: &str) -> SyncResult<Option<String>>;

    /// Pushes an encoded snapshot to a store.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Network`] on transport failure.
    fn push(&self, store_id: &str, request: &PushRequest) -> SyncResult<PushResponse>;
}

/// A mock transport for testing.
///
/// Behaves like a trivial server: it remembers the last pushed token
/// and serves it back on fetch. Failures can be injected, and every
/// push is recorded.
#[derive(Default)]
pub struct MockTransport {
    remote: Mutex<Option<String>>,
    pushes: Mutex<Vec<PushRequest>>,
    push_response: Mutex<Option<PushResponse>>,
    fail_remaining: AtomicU32,
}

impl MockTransport {
    /// Creates a new mock transport with an empty remote store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the remote store with a token.
    pub fn set_remote_token(&self, token: impl Into<String>) {
        *self.remote.lock() = Some(token.into());
    }

    /// Returns the current remote token.
    pub fn remote_token(&self) -> Option<String> {
        self.remote.lock().clone()
    }

    /// Overrides the response returned for the next pushes.
    pub fn set_push_response(&self, response: PushResponse) {
        *self.push_response.lock() = Some(response);
    }

    /// Makes the next `count` operations fail with a retryable network
    /// error.
    pub fn fail_next(&self, count: u32) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Returns all recorded push requests.
    pub fn pushes(&self) -> Vec<PushRequest> {
        self.pushes.lock().clone()
    }

    /// Returns the number of recorded pushes.
    pub fn push_count(&self) -> usize {
        self.pushes.lock().len()
    }

    fn check_failure(&self) -> SyncResult<()> {
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::network_retryable("injected failure"));
        }
        Ok(())
    }
}

impl SyncTransport for MockTransport {
    fn fetch(&self, _store_id: &str) -> SyncResult<Option<String>> {
        self.check_failure()?;
        Ok(self.remote.lock().clone())
    }

    fn push(&self, _store_id: &str, request: &PushRequest) -> SyncResult<PushResponse> {
        self.check_failure()?;
        self.pushes.lock().push(request.clone());

        if let Some(response) = self.push_response.lock().clone() {
            return Ok(response);
        }

        *self.remote.lock() = Some(request.token.clone());
        Ok(PushResponse::accepted(request.timestamp, request.version))
    }
}
