//! Wire messages for the two sync verbs.
//!
//! A logical store's endpoint speaks two verbs: a fetch (GET) returning
//! the current server-side encoded token, or nothing; and a push (POST)
//! carrying a token plus snapshot metadata, answered with the server's
//! resulting metadata and a conflict flag.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// The push body sent to a store endpoint.
///
/// The token already encodes the full snapshot; the metadata rides
/// alongside so the server can detect conflicts without decoding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    /// The encoded snapshot token.
    pub token: String,
    /// Snapshot timestamp in milliseconds since the epoch.
    pub timestamp: u64,
    /// Snapshot version.
    pub version: u64,
    /// Identifier of the pushing client.
    pub client_id: String,
}

impl PushRequest {
    /// Builds a push request for an encoded snapshot.
    pub fn new(token: impl Into<String>, snapshot: &Snapshot) -> Self {
        Self {
            token: token.into(),
            timestamp: snapshot.timestamp,
            version: snapshot.version,
            client_id: snapshot.client_id.clone(),
        }
    }
}

/// The server's answer to a push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    /// Server-side snapshot timestamp after the push.
    pub timestamp: u64,
    /// Server-side snapshot version after the push.
    pub version: u64,
    /// Whether the push conflicted with the server copy.
    pub conflict: bool,
    /// The server-resolved token, when the server performed resolution
    /// itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub resolved_token: Option<String>,
}

impl PushResponse {
    /// Builds the response for an accepted, conflict-free push.
    pub fn accepted(timestamp: u64, version: u64) -> Self {
        Self {
            timestamp,
            version,
            conflict: false,
            resolved_token: None,
        }
    }

    /// Builds a conflict response, optionally carrying a
    /// server-resolved token.
    pub fn conflicted(timestamp: u64, version: u64, resolved_token: Option<String>) -> Self {
        Self {
            timestamp,
            version,
            conflict: true,
            resolved_token,
        }
    }
}
