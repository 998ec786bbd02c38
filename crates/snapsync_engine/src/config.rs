//! Configuration for the sync engine.

use snapsync_codec::CompressMode;
use snapsync_protocol::{generate_client_id, ConflictStrategy};
use std::time::Duration;

/// Configuration for one logical store's sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// The logical store identifier.
    pub store_id: String,
    /// Base URL of the sync server.
    pub endpoint: String,
    /// Identifier of this client. Generated if not supplied.
    pub client_id: String,
    /// Identifier of the owning user, if any.
    pub user_id: Option<String>,
    /// Conflict resolution strategy.
    pub strategy: ConflictStrategy,
    /// Retry configuration for failed sync cycles.
    pub retry: RetryConfig,
    /// Interval for automatic background sync, if any.
    pub sync_interval: Option<Duration>,
    /// Delay between coming online and the first sync, so a burst of
    /// reconnecting clients does not stampede the server.
    pub settle_delay: Duration,
    /// Per-request network timeout, enforced at the HTTP client
    /// boundary.
    pub timeout: Duration,
    /// Whether snapshots are encrypted in the cache and on the wire.
    pub encrypt: bool,
    /// Password for snapshot encryption.
    pub password: Option<String>,
    /// Compression mode for encoded snapshots.
    pub compress: CompressMode,
    /// TTL for locally cached snapshots, if any.
    pub cache_ttl: Option<Duration>,
}

impl SyncConfig {
    /// Creates a configuration for a store synced against an endpoint.
    pub fn new(store_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            endpoint: endpoint.into(),
            client_id: generate_client_id(),
            user_id: None,
            strategy: ConflictStrategy::default(),
            retry: RetryConfig::default(),
            sync_interval: None,
            settle_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
            encrypt: false,
            password: None,
            compress: CompressMode::Auto,
            cache_ttl: None,
        }
    }

    /// Sets the client identifier.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Sets the owning user identifier.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the conflict resolution strategy.
    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Enables automatic background sync at the given interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Sets the reconnect settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the per-request network timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables snapshot encryption with the given password.
    pub fn with_encryption(mut self, password: impl Into<String>) -> Self {
        self.encrypt = true;
        self.password = Some(password.into());
        self
    }

    /// Sets the compression mode for encoded snapshots.
    pub fn with_compress(mut self, mode: CompressMode) -> Self {
        self.compress = mode;
        self
    }

    /// Sets the TTL for locally cached snapshots.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}

/// Configuration for retry behavior.
///
/// Failed sync cycles back off exponentially: the delay before retry
/// `n` (0-indexed) is `base_delay * 2^n`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per trigger, including the first.
    pub max_attempts: u32,
    /// Base delay; the default of one second gives the 1s, 2s, 4s, ...
    /// ladder.
    pub base_delay: Duration,
    /// Cap on the computed delay.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Creates a retry configuration with the given attempt ceiling.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Creates a configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Returns the backoff delay before retry `retry_count` (0-indexed).
    pub fn delay_for_retry(&self, retry_count: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_count.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = SyncConfig::new("notes", "https://sync.example.com")
            .with_client_id("client-1")
            .with_user_id("user-1")
            .with_timeout(Duration::from_secs(5))
            .with_settle_delay(Duration::from_millis(100));

        assert_eq!(config.store_id, "notes");
        assert_eq!(config.endpoint, "https://sync.example.com");
        assert_eq!(config.client_id, "client-1");
        assert_eq!(config.user_id.as_deref(), Some("user-1"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn client_id_is_generated_by_default() {
        let a = SyncConfig::new("s", "http://x");
        let b = SyncConfig::new("s", "http://x");
        assert_ne!(a.client_id, b.client_id);
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let retry = RetryConfig::new(5);
        assert_eq!(retry.delay_for_retry(0), Duration::from_secs(1));
        assert_eq!(retry.delay_for_retry(1), Duration::from_secs(2));
        assert_eq!(retry.delay_for_retry(2), Duration::from_secs(4));
        assert_eq!(retry.delay_for_retry(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_respects_cap() {
        let retry = RetryConfig::new(10).with_max_delay(Duration::from_secs(5));
        assert_eq!(retry.delay_for_retry(6), Duration::from_secs(5));
        // Huge retry counts must not overflow.
        assert_eq!(retry.delay_for_retry(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn no_retry_config() {
        assert_eq!(RetryConfig::no_retry().max_attempts, 1);
    }
}
