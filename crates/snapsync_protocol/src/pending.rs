//! Pending sync work queued while the network is unreachable.

use crate::snapshot::now_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The direction of a queued sync operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PendingOperation {
    /// Push the local snapshot to the server.
    Upload,
    /// Pull the server snapshot to the client.
    Download,
}

/// A sync operation queued while offline.
///
/// Queued when a push cannot reach the network; consumed and cleared
/// once a connectivity-restored sync cycle completes, whether by
/// success or exhausted retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSyncItem {
    /// The logical store the operation belongs to.
    pub store_id: String,
    /// The queued operation.
    pub operation: PendingOperation,
    /// The state value to upload; `Null` for downloads.
    pub data: Value,
    /// When the operation was queued, milliseconds since the epoch.
    pub timestamp: u64,
    /// How many delivery attempts have failed so far.
    pub retries: u32,
}

impl PendingSyncItem {
    /// Queues an upload of the given state value.
    pub fn upload(store_id: impl Into<String>, data: Value) -> Self {
        Self {
            store_id: store_id.into(),
            operation: PendingOperation::Upload,
            data,
            timestamp: now_millis(),
            retries: 0,
        }
    }

    /// Queues a download request.
    pub fn download(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            operation: PendingOperation::Download,
            data: Value::Null,
            timestamp: now_millis(),
            retries: 0,
        }
    }

    /// Records a failed delivery attempt.
    pub fn record_failure(&mut self) {
        self.retries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_item_carries_data() {
        let item = PendingSyncItem::upload("store-1", json!({"n": 1}));
        assert_eq!(item.operation, PendingOperation::Upload);
        assert_eq!(item.data, json!({"n": 1}));
        assert_eq!(item.retries, 0);
    }

    #[test]
    fn download_item_has_no_data() {
        let item = PendingSyncItem::download("store-1");
        assert_eq!(item.operation, PendingOperation::Download);
        assert_eq!(item.data, Value::Null);
    }

    #[test]
    fn failures_accumulate() {
        let mut item = PendingSyncItem::upload("s", json!(1));
        item.record_failure();
        item.record_failure();
        assert_eq!(item.retries, 2);
    }

    #[test]
    fn item_wire_shape() {
        let item = PendingSyncItem::upload("store-1", json!(1));
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"storeId\":\"store-1\""));
        assert!(json.contains("\"operation\":\"upload\""));

        let back: PendingSyncItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
