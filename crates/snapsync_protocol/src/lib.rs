//! # snapsync protocol
//!
//! Shared types for snapshot synchronization: the snapshot itself,
//! checksum computation over canonical JSON, conflict-resolution
//! strategies, the wire messages for the two sync verbs, and the items
//! queued while offline.
//!
//! ## Key Invariants
//!
//! - Equal checksums mean equivalent snapshots, regardless of
//!   timestamp or version
//! - `version` is bumped only by conflict resolution and serves as a
//!   tie-break hint, never the sole consistency mechanism
//! - One logical store identifier owns at most one live snapshot

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod messages;
mod pending;
mod snapshot;

pub use conflict::{deep_merge, ConflictStrategy, CustomResolver};
pub use messages::{PushRequest, PushResponse};
pub use pending::{PendingOperation, PendingSyncItem};
pub use snapshot::{checksum_of, generate_client_id, now_millis, Snapshot};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn arb_json(depth: u32) -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::from),
        ];
        leaf.prop_recursive(depth, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4).prop_map(|m| json!(m)),
            ]
        })
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(client in arb_json(3), server in arb_json(3)) {
            let a = deep_merge(&client, &server);
            let b = deep_merge(&client, &server);
            prop_assert_eq!(checksum_of(&a), checksum_of(&b));
        }

        #[test]
        fn merge_with_self_is_identity(value in arb_json(3)) {
            prop_assert_eq!(deep_merge(&value, &value), value);
        }

        #[test]
        fn checksum_matches_structural_equality(value in arb_json(3)) {
            let clone = value.clone();
            prop_assert_eq!(checksum_of(&value), checksum_of(&clone));
        }
    }
}
