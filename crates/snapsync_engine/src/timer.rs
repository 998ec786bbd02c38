//! Periodic auto-sync timer.

use crate::state::{SyncEngine, SyncState};
use crate::transport::SyncTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Handle for a running auto-sync timer.
///
/// The timer fires a sync on a fixed interval, only while the engine is
/// online and idle. Dropping the handle stops the timer thread, so a
/// torn-down store cannot leak its timer.
pub struct AutoSync {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AutoSync {
    /// Starts the auto-sync timer for an engine.
    ///
    /// The interval comes from the engine configuration, falling back
    /// to the given default when none is configured.
    pub fn start<T: SyncTransport + 'static>(
        engine: Arc<SyncEngine<T>>,
        default_interval: Duration,
    ) -> Self {
        let interval = engine.config().sync_interval.unwrap_or(default_interval);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::spawn(move || {
            // Short ticks keep the thread responsive to stop requests.
            let tick = Duration::from_millis(20).min(interval);
            let mut elapsed = Duration::ZERO;

            while !stop_flag.load(Ordering::SeqCst) {
                std::thread::sleep(tick);
                elapsed += tick;
                if elapsed < interval {
                    continue;
                }
                elapsed = Duration::ZERO;

                if !engine.watcher().is_online() || engine.state() != SyncState::Idle {
                    continue;
                }
                if let Err(e) = engine.sync() {
                    debug!(error = %e, "auto-sync cycle failed");
                }
            }
        });

        Self {
            stop,
            thread: Some(thread),
        }
    }

    /// Stops the timer and waits for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::connectivity::ConnectivityWatcher;
    use crate::transport::MockTransport;
    use serde_json::json;
    use snapsync_cache::CacheManager;
    use snapsync_protocol::Snapshot;
    use snapsync_storage::MemoryBackend;

    fn engine(interval: Duration) -> Arc<SyncEngine<MockTransport>> {
        let config = SyncConfig::new("notes", "http://localhost:9")
            .with_client_id("client-1")
            .with_sync_interval(interval);
        let cache = CacheManager::new(Arc::new(MemoryBackend::new()));
        let watcher = Arc::new(ConnectivityWatcher::new(true));
        Arc::new(SyncEngine::new(config, MockTransport::new(), cache, watcher).unwrap())
    }

    #[test]
    fn timer_pulls_remote_changes() {
        let engine = engine(Duration::from_millis(20));

        let remote = Snapshot::new(json!({"from": "server"}), "other");
        let token = snapsync_codec::encode(
            &serde_json::to_value(&remote).unwrap(),
            &snapsync_codec::EncodeOptions::new(),
        )
        .unwrap();
        engine.transport.set_remote_token(token);

        let timer = AutoSync::start(Arc::clone(&engine), Duration::from_secs(60));
        for _ in 0..100 {
            if engine.snapshot().is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        timer.stop();

        assert_eq!(
            engine.snapshot().unwrap().data,
            json!({"from": "server"})
        );
    }

    #[test]
    fn timer_is_quiet_while_offline() {
        let engine = engine(Duration::from_millis(10));
        engine.watcher().set_online(false);

        let timer = AutoSync::start(Arc::clone(&engine), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(60));
        timer.stop();

        assert_eq!(engine.stats().cycles_completed, 0);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn stopping_twice_is_safe() {
        let engine = engine(Duration::from_millis(10));
        let timer = AutoSync::start(engine, Duration::from_secs(60));
        timer.stop();
        // Drop of an already-stopped handle must not hang.
    }
}
