//! Conflict resolution between divergent client and server snapshots.

use crate::snapshot::{checksum_of, now_millis, Snapshot};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A caller-supplied resolution function.
///
/// Receives the client and server snapshots and returns the resolved
/// state value.
pub type CustomResolver = Arc<dyn Fn(&Snapshot, &Snapshot) -> Value + Send + Sync>;

/// The strategy used to reconcile two divergent snapshots into one.
#[derive(Clone, Default)]
pub enum ConflictStrategy {
    /// The client copy wins outright.
    ClientWins,
    /// The server copy wins outright.
    #[default]
    ServerWins,
    /// The most recent `timestamp` wins outright. Ties fall back to the
    /// higher `version`, then to the server copy.
    Timestamp,
    /// Deep merge. Objects merge key-wise with client values winning on
    /// primitive collisions and recursion into nested objects; arrays
    /// concatenate server items first, then client items not already
    /// present (structural equality).
    ///
    /// The client-wins rule is asymmetric and order-dependent; this is
    /// a documented limitation, not a three-way merge.
    Merge,
    /// A caller-supplied resolution function.
    Custom(CustomResolver),
}

impl std::fmt::Debug for ConflictStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConflictStrategy::ClientWins => "ClientWins",
            ConflictStrategy::ServerWins => "ServerWins",
            ConflictStrategy::Timestamp => "Timestamp",
            ConflictStrategy::Merge => "Merge",
            ConflictStrategy::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}

impl ConflictStrategy {
    /// Resolves a conflict between a client and a server snapshot.
    ///
    /// The resolved snapshot carries the client's identity fields, a
    /// fresh timestamp and checksum, and a version of
    /// `max(client, server) + 1`.
    pub fn resolve(&self, client: &Snapshot, server: &Snapshot) -> Snapshot {
        let data = match self {
            ConflictStrategy::ClientWins => client.data.clone(),
            ConflictStrategy::ServerWins => server.data.clone(),
            ConflictStrategy::Timestamp => {
                if newest_is_client(client, server) {
                    client.data.clone()
                } else {
                    server.data.clone()
                }
            }
            ConflictStrategy::Merge => deep_merge(&client.data, &server.data),
            ConflictStrategy::Custom(resolver) => resolver(client, server),
        };

        let checksum = checksum_of(&data);
        Snapshot {
            data,
            timestamp: now_millis(),
            version: client.version.max(server.version) + 1,
            checksum,
            encrypted: client.encrypted || server.encrypted,
            client_id: client.client_id.clone(),
            user_id: client.user_id.clone().or_else(|| server.user_id.clone()),
        }
    }
}

/// Timestamp comparison with version as the tie-break hint and the
/// server copy as the final tie resolution.
fn newest_is_client(client: &Snapshot, server: &Snapshot) -> bool {
    if client.timestamp != server.timestamp {
        return client.timestamp > server.timestamp;
    }
    client.version > server.version
}

/// Deep-merges two state values.
///
/// - Objects merge key-wise: both-object values recurse, both-array
///   values follow the array rule, anything else keeps the client value.
/// - Arrays keep server items in order, then append client items not
///   already present, compared by structural equality.
/// - Any other combination keeps the client value.
pub fn deep_merge(client: &Value, server: &Value) -> Value {
    match (client, server) {
        (Value::Object(client_map), Value::Object(server_map)) => {
            let mut merged = Map::new();
            for (key, server_value) in server_map {
                match client_map.get(key) {
                    Some(client_value) => {
                        merged.insert(key.clone(), deep_merge(client_value, server_value));
                    }
                    None => {
                        merged.insert(key.clone(), server_value.clone());
                    }
                }
            }
            for (key, client_value) in client_map {
                if !merged.contains_key(key) {
                    merged.insert(key.clone(), client_value.clone());
                }
            }
            Value::Object(merged)
        }
        (Value::Array(client_items), Value::Array(server_items)) => {
            let mut merged = server_items.clone();
            for item in client_items {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            Value::Array(merged)
        }
        (client_value, _) => client_value.clone(),
    }
}
