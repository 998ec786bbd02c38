//! Configuration for the sync server.

use snapsync_protocol::ConflictStrategy;

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Whether the server resolves conflicts itself. When false,
    /// conflicting pushes are rejected with `conflict: true` and the
    /// client reconciles on its next pull.
    pub resolve_conflicts: bool,
    /// Strategy used for server-side resolution. The pushing client is
    /// treated as the client side.
    pub strategy: ConflictStrategy,
    /// Password for decoding and re-encoding encrypted tokens during
    /// server-side resolution. Without it, encrypted conflicts are
    /// rejected instead of resolved.
    pub password: Option<String>,
}

impl ServerConfig {
    /// Creates a configuration that rejects conflicts for client-side
    /// resolution.
    pub fn new() -> Self {
        Self {
            resolve_conflicts: false,
            strategy: ConflictStrategy::default(),
            password: None,
        }
    }

    /// Enables server-side conflict resolution with the given strategy.
    pub fn with_resolution(mut self, strategy: ConflictStrategy) -> Self {
        self.resolve_conflicts = true;
        self.strategy = strategy;
        self
    }

    /// Supplies the password for resolving encrypted tokens.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
