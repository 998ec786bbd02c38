//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted behind a trait so different
//! libraries (or non-HTTP carriers) can be plugged in; the transport
//! owns URL layout and JSON body handling.

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use parking_lot::RwLock;
use snapsync_protocol::{PushRequest, PushResponse};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A minimal HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// HTTP client abstraction.
///
/// Implementations should enforce the supplied timeout at the request
/// boundary; it bounds worst-case sync latency.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, String>;

    /// Sends a POST request with a JSON body.
    fn post(&self, url: &str, body: String, timeout: Duration) -> Result<HttpResponse, String>;
}

/// HTTP-based sync transport.
///
/// Maps the two sync verbs onto a per-store endpoint:
/// `GET {base}/stores/{id}` returns the current encoded token (204 or
/// an empty body when the store is empty), and
/// `POST {base}/stores/{id}` accepts a [`PushRequest`] and returns a
/// [`PushResponse`], both as JSON.
pub struct HttpTransport<C: HttpClient> {
    base_url: String,
    client: C,
    timeout: Duration,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            timeout,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Returns whether the last request succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn store_url(&self, store_id: &str) -> String {
        format!("{}/stores/{}", self.base_url.trim_end_matches('/'), store_id)
    }

    fn record_failure(&self, message: &str) -> SyncError {
        *self.last_error.write() = Some(message.to_string());
        self.connected.store(false, Ordering::SeqCst);
        SyncError::network_retryable(message)
    }

    fn record_success(&self) {
        *self.last_error.write() = None;
        self.connected.store(true, Ordering::SeqCst);
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn fetch(&self, store_id: &str) -> SyncResult<Option<String>> {
        let url = self.store_url(store_id);
        let response = self
            .client
            .get(&url, self.timeout)
            .map_err(|e| self.record_failure(&e))?;

        match response.status {
            204 | 404 => {
                self.record_success();
                Ok(None)
            }
            200 => {
                self.record_success();
                let token = response.body.trim().to_string();
                Ok(if token.is_empty() { None } else { Some(token) })
            }
            status => Err(self.record_failure(&format!("unexpected status {status}"))),
        }
    }

    fn push(&self, store_id: &str, request: &PushRequest) -> SyncResult<PushResponse> {
        let body = serde_json::to_string(request)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        let url = self.store_url(store_id);
        let response = self
            .client
            .post(&url, body, self.timeout)
            .map_err(|e| self.record_failure(&e))?;

        if response.status != 200 {
            return Err(self.record_failure(&format!("unexpected status {}", response.status)));
        }
        self.record_success();

        serde_json::from_str(&response.body)
            .map_err(|e| SyncError::Serialization(format!("bad push response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use snapsync_protocol::Snapshot;

    /// Scripted HTTP client for transport tests.
    #[derive(Default)]
    struct ScriptedClient {
        responses: Mutex<Vec<Result<HttpResponse, String>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn push_response(&self, response: Result<HttpResponse, String>) {
            self.responses.lock().push(response);
        }

        fn next(&self) -> Result<HttpResponse, String> {
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Err("no scripted response".into());
            }
            responses.remove(0)
        }
    }

    impl HttpClient for ScriptedClient {
        fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, String> {
            self.requests.lock().push(format!("GET {url}"));
            self.next()
        }

        fn post(&self, url: &str, _body: String, _timeout: Duration) -> Result<HttpResponse, String> {
            self.requests.lock().push(format!("POST {url}"));
            self.next()
        }
    }

    fn transport(client: ScriptedClient) -> HttpTransport<ScriptedClient> {
        HttpTransport::new("https://sync.example.com/", client, Duration::from_secs(5))
    }

    #[test]
    fn fetch_builds_store_url() {
        let client = ScriptedClient::default();
        client.push_response(Ok(HttpResponse::new(200, "tok")));
        let transport = transport(client);

        let token = transport.fetch("notes").unwrap();
        assert_eq!(token.as_deref(), Some("tok"));
        assert_eq!(
            transport.client.requests.lock()[0],
            "GET https://sync.example.com/stores/notes"
        );
    }

    #[test]
    fn fetch_maps_empty_store_to_none() {
        let client = ScriptedClient::default();
        client.push_response(Ok(HttpResponse::new(204, "")));
        client.push_response(Ok(HttpResponse::new(200, "  ")));
        let transport = transport(client);

        assert!(transport.fetch("s").unwrap().is_none());
        assert!(transport.fetch("s").unwrap().is_none());
    }

    #[test]
    fn transport_error_is_retryable_and_recorded() {
        let client = ScriptedClient::default();
        client.push_response(Err("connection refused".into()));
        let transport = transport(client);

        let err = transport.fetch("s").unwrap_err();
        assert!(err.is_retryable());
        assert!(!transport.is_connected());
        assert_eq!(transport.last_error().as_deref(), Some("connection refused"));
    }

    #[test]
    fn push_round_trip() {
        let client = ScriptedClient::default();
        let response_body = serde_json::to_string(&PushResponse::accepted(1, 2)).unwrap();
        client.push_response(Ok(HttpResponse::new(200, response_body)));
        let transport = transport(client);

        let request = PushRequest::new("tok", &Snapshot::new(json!(1), "c"));
        let response = transport.push("s", &request).unwrap();
        assert!(!response.conflict);
        assert!(transport.is_connected());
    }

    #[test]
    fn push_rejects_bad_status() {
        let client = ScriptedClient::default();
        client.push_response(Ok(HttpResponse::new(500, "oops")));
        let transport = transport(client);

        let request = PushRequest::new("tok", &Snapshot::new(json!(1), "c"));
        assert!(transport.push("s", &request).is_err());
    }
}
