//! The sync server: handlers for the two verbs.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::{StoreRegistry, StoredSnapshot};
use snapsync_codec::{CompressMode, DecodeOptions, EncodeOptions};
use snapsync_protocol::{PushRequest, PushResponse, Snapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Counters accumulated across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Total fetch requests handled.
    pub fetches: u64,
    /// Total push requests handled.
    pub pushes: u64,
    /// Total conflicting pushes.
    pub conflicts: u64,
}

/// The reference sync server.
///
/// Transport-agnostic: an embedding HTTP layer maps
/// `GET /stores/{id}` to [`handle_fetch`](Self::handle_fetch) (answering
/// 204 for `None`) and `POST /stores/{id}` to
/// [`handle_push`](Self::handle_push). Authentication, when wanted, is
/// a [`TokenValidator`](crate::TokenValidator) check in that same layer
/// before the handler runs.
///
/// The server holds one snapshot per logical store. A push whose
/// version/timestamp is older than the server copy is a conflict:
/// either rejected for client-side reconciliation, or resolved in place
/// when the server is configured with a strategy.
pub struct SyncServer {
    config: ServerConfig,
    registry: Arc<StoreRegistry>,
    fetches: AtomicU64,
    pushes: AtomicU64,
    conflicts: AtomicU64,
}

impl SyncServer {
    /// Creates a new sync server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(StoreRegistry::new()))
    }

    /// Creates a sync server sharing an existing registry.
    pub fn with_registry(config: ServerConfig, registry: Arc<StoreRegistry>) -> Self {
        Self {
            config,
            registry,
            fetches: AtomicU64::new(0),
            pushes: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
        }
    }

    /// Returns the store registry.
    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    /// Returns a copy of the request counters.
    pub fn stats(&self) -> ServerStats {
        ServerStats {
            fetches: self.fetches.load(Ordering::SeqCst),
            pushes: self.pushes.load(Ordering::SeqCst),
            conflicts: self.conflicts.load(Ordering::SeqCst),
        }
    }

    /// Handles a fetch: returns the current encoded token for a store,
    /// or `None` when the store is empty.
    pub fn handle_fetch(&self, store_id: &str) -> Option<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.registry.get(store_id).map(|stored| stored.token)
    }

    /// Handles a push.
    ///
    /// # Errors
    ///
    /// Returns codec errors when server-side resolution cannot decode
    /// the involved tokens.
    pub fn handle_push(
        &self,
        store_id: &str,
        request: &PushRequest,
    ) -> ServerResult<PushResponse> {
        self.pushes.fetch_add(1, Ordering::SeqCst);

        let Some(existing) = self.registry.get(store_id) else {
            self.accept(store_id, request);
            return Ok(PushResponse::accepted(request.timestamp, request.version));
        };

        let incoming_is_stale = request.version < existing.version
            || (request.version == existing.version && request.timestamp < existing.timestamp);

        if !incoming_is_stale {
            self.accept(store_id, request);
            return Ok(PushResponse::accepted(request.timestamp, request.version));
        }

        self.conflicts.fetch_add(1, Ordering::SeqCst);
        debug!(
            store = store_id,
            incoming_version = request.version,
            server_version = existing.version,
            "conflicting push"
        );

        if self.config.resolve_conflicts {
            let resolved = self.resolve(store_id, &existing, request)?;
            Ok(PushResponse::conflicted(
                resolved.timestamp,
                resolved.version,
                Some(resolved.token),
            ))
        } else {
            Ok(PushResponse::conflicted(
                existing.timestamp,
                existing.version,
                None,
            ))
        }
    }

    fn accept(&self, store_id: &str, request: &PushRequest) {
        self.registry.put(
            store_id,
            StoredSnapshot {
                token: request.token.clone(),
                timestamp: request.timestamp,
                version: request.version,
                client_id: request.client_id.clone(),
            },
        );
    }

    /// Resolves a conflicting push server-side and stores the result.
    fn resolve(
        &self,
        store_id: &str,
        existing: &StoredSnapshot,
        request: &PushRequest,
    ) -> ServerResult<StoredSnapshot> {
        let decode_options = DecodeOptions {
            password: self.config.password.clone(),
            strict_version: true,
        };

        let client = self.decode_snapshot(&request.token, &decode_options)?;
        let server = self.decode_snapshot(&existing.token, &decode_options)?;
        let resolved = self.config.strategy.resolve(&client, &server);

        let encode_options = EncodeOptions {
            compress: CompressMode::Auto,
            encrypt: resolved.encrypted,
            password: self.config.password.clone(),
            format_version: None,
        };
        let value = serde_json::to_value(&resolved)
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
        let token = snapsync_codec::encode(&value, &encode_options)?;

        let stored = StoredSnapshot {
            token,
            timestamp: resolved.timestamp,
            version: resolved.version,
            client_id: resolved.client_id.clone(),
        };
        self.registry.put(store_id, stored.clone());
        Ok(stored)
    }

    fn decode_snapshot(
        &self,
        token: &str,
        options: &DecodeOptions,
    ) -> ServerResult<Snapshot> {
        let value = snapsync_codec::decode(token, options)?;
        serde_json::from_value(value).map_err(|e| ServerError::InvalidRequest(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use snapsync_protocol::ConflictStrategy;

    fn encode_snapshot(snapshot: &Snapshot) -> String {
        snapsync_codec::encode(
            &serde_json::to_value(snapshot).unwrap(),
            &EncodeOptions::new(),
        )
        .unwrap()
    }

    fn push_for(data: Value, timestamp: u64, version: u64) -> PushRequest {
        let mut snapshot = Snapshot::new(data, "client-1");
        snapshot.timestamp = timestamp;
        snapshot.version = version;
        PushRequest::new(encode_snapshot(&snapshot), &snapshot)
    }

    #[test]
    fn fetch_empty_store_is_none() {
        let server = SyncServer::new(ServerConfig::default());
        assert!(server.handle_fetch("notes").is_none());
        assert_eq!(server.stats().fetches, 1);
    }

    #[test]
    fn first_push_is_accepted_and_served() {
        let server = SyncServer::new(ServerConfig::default());
        let request = push_for(json!({"n": 1}), 1000, 1);

        let response = server.handle_push("notes", &request).unwrap();
        assert!(!response.conflict);
        assert_eq!(response.version, 1);

        assert_eq!(server.handle_fetch("notes").unwrap(), request.token);
    }

    #[test]
    fn newer_push_overwrites() {
        let server = SyncServer::new(ServerConfig::default());
        server.handle_push("notes", &push_for(json!(1), 1000, 1)).unwrap();

        let newer = push_for(json!(2), 2000, 2);
        let response = server.handle_push("notes", &newer).unwrap();
        assert!(!response.conflict);
        assert_eq!(server.handle_fetch("notes").unwrap(), newer.token);
    }

    #[test]
    fn stale_push_conflicts_without_resolution() {
        let server = SyncServer::new(ServerConfig::default());
        let current = push_for(json!(2), 2000, 3);
        server.handle_push("notes", &current).unwrap();

        let stale = push_for(json!(1), 1000, 1);
        let response = server.handle_push("notes", &stale).unwrap();

        assert!(response.conflict);
        assert!(response.resolved_token.is_none());
        assert_eq!(response.version, 3);
        // The server kept its copy.
        assert_eq!(server.handle_fetch("notes").unwrap(), current.token);
        assert_eq!(server.stats().conflicts, 1);
    }

    #[test]
    fn server_side_merge_resolution() {
        let config = ServerConfig::new().with_resolution(ConflictStrategy::Merge);
        let server = SyncServer::new(config);

        server
            .handle_push("notes", &push_for(json!({"a": 1}), 2000, 3))
            .unwrap();
        let stale = push_for(json!({"b": 2}), 1000, 1);
        let response = server.handle_push("notes", &stale).unwrap();

        assert!(response.conflict);
        let resolved_token = response.resolved_token.unwrap();
        let resolved_value = snapsync_codec::decode(
            &resolved_token,
            &snapsync_codec::DecodeOptions::new(),
        )
        .unwrap();
        let resolved: Snapshot = serde_json::from_value(resolved_value).unwrap();

        // The pushing client is the client side of the merge.
        assert_eq!(resolved.data, json!({"a": 1, "b": 2}));
        assert_eq!(resolved.version, 4);

        // The resolved snapshot is now what the store serves.
        assert_eq!(server.handle_fetch("notes").unwrap(), resolved_token);
    }

    #[test]
    fn stats_accumulate() {
        let server = SyncServer::new(ServerConfig::default());
        server.handle_fetch("a");
        server.handle_push("a", &push_for(json!(1), 1, 1)).unwrap();
        server.handle_push("a", &push_for(json!(2), 2, 2)).unwrap();

        let stats = server.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.pushes, 2);
        assert_eq!(stats.conflicts, 0);
    }
}
