//! Snapshots: checksummed, versioned copies of a logical store's state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time as milliseconds since the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Computes the deterministic checksum of a state value.
///
/// SHA-256 over the value's canonical JSON form, rendered as lowercase
/// hex. `serde_json` maps iterate in sorted key order, so structurally
/// equal values always produce the same digest.
pub fn checksum_of(data: &Value) -> String {
    let canonical = data.to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generates a fresh client identifier.
pub fn generate_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A checksummed, versioned copy of a logical store's state at a point
/// in time.
///
/// Two snapshots with equal checksums are considered equivalent
/// regardless of `timestamp` or `version`. `version` increases
/// monotonically, bumped by every conflict resolution, and is only a
/// tie-break hint, never the sole consistency mechanism. No history is
/// retained: a snapshot is superseded by the next one for the same
/// store identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// The state value.
    pub data: Value,
    /// Creation time in milliseconds since the epoch.
    pub timestamp: u64,
    /// Monotonically increasing resolution counter.
    pub version: u64,
    /// Digest of `data`'s canonical JSON form.
    pub checksum: String,
    /// Whether this snapshot is stored and shipped encrypted.
    pub encrypted: bool,
    /// Identifier of the client that produced the snapshot.
    pub client_id: String,
    /// Identifier of the owning user, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Snapshot {
    /// Creates a snapshot of the given state value.
    pub fn new(data: Value, client_id: impl Into<String>) -> Self {
        let checksum = checksum_of(&data);
        Self {
            data,
            timestamp: now_millis(),
            version: 1,
            checksum,
            encrypted: false,
            client_id: client_id.into(),
            user_id: None,
        }
    }

    /// Sets the owning user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Marks the snapshot as encrypted.
    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    /// Creates the successor snapshot after a local state change.
    ///
    /// Carries the identity fields forward and recomputes timestamp and
    /// checksum. The version is unchanged; only conflict resolution
    /// bumps it.
    pub fn succeed(&self, data: Value) -> Self {
        let checksum = checksum_of(&data);
        Self {
            data,
            timestamp: now_millis(),
            version: self.version,
            checksum,
            encrypted: self.encrypted,
            client_id: self.client_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Returns true if the two snapshots hold equivalent state.
    pub fn is_equivalent(&self, other: &Snapshot) -> bool {
        self.checksum == other.checksum
    }
}
