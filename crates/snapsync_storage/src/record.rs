//! Stored records and expiry bookkeeping.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time as milliseconds since the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// What a storage backend actually holds for one key.
///
/// A record whose `expires_at` is in the past must be treated as absent
/// by all read operations and opportunistically deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// The stored payload text.
    pub payload: String,
    /// Expiry timestamp in milliseconds since the epoch, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl StoredRecord {
    /// Creates a record, computing `expires_at` from an optional TTL.
    pub fn new(payload: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            payload: payload.into(),
            expires_at: ttl.map(|ttl| now_millis().saturating_add(ttl.as_millis() as u64)),
        }
    }

    /// Creates a record that never expires.
    pub fn permanent(payload: impl Into<String>) -> Self {
        Self::new(payload, None)
    }

    /// Returns true if the record has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Returns true if the record is expired at the given time.
    pub fn is_expired_at(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}
