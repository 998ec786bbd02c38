//! # snapsync server
//!
//! Reference sync server for snapsync stores.
//!
//! The server is transport-agnostic: it exposes one handler per sync
//! verb and an embedding layer maps them onto HTTP (or anything else).
//! It keeps one snapshot per logical store, detects conflicting pushes
//! by version/timestamp, and can optionally resolve conflicts itself
//! with any [`ConflictStrategy`](snapsync_protocol::ConflictStrategy).
//!
//! ## Example
//!
//! ```rust
//! use snapsync_server::{ServerConfig, SyncServer};
//! use snapsync_protocol::{PushRequest, Snapshot};
//! use serde_json::json;
//!
//! let server = SyncServer::new(ServerConfig::default());
//! assert!(server.handle_fetch("notes").is_none());
//!
//! let snapshot = Snapshot::new(json!({"n": 1}), "client-1");
//! let token = snapsync_codec::encode(
//!     &serde_json::to_value(&snapshot).unwrap(),
//!     &snapsync_codec::EncodeOptions::new(),
//! )
//! .unwrap();
//! let response = server
//!     .handle_push("notes", &PushRequest::new(token, &snapshot))
//!     .unwrap();
//! assert!(!response.conflict);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod error;
mod server;
mod store;

pub use auth::{AuthConfig, TokenClaims, TokenValidator};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{ServerStats, SyncServer};
pub use store::{StoreRegistry, StoredSnapshot};
