//! Sync engine state machine.

use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityEvent, ConnectivityWatcher};
use crate::error::{SyncError, SyncResult};
use crate::events::{ListenerHandle, ListenerSet, SyncEvent};
use crate::transport::SyncTransport;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snapsync_cache::{CacheManager, CacheOptions};
use snapsync_codec::{DecodeOptions, EncodeOptions};
use snapsync_protocol::{
    now_millis, PendingOperation, PendingSyncItem, PushRequest, PushResponse, Snapshot,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine is idle, not syncing.
    Idle,
    /// Engine is running a sync cycle.
    Syncing,
    /// Engine is waiting before retrying a failed cycle.
    RetryWait,
}

impl SyncState {
    /// Returns true if a new sync cycle can begin from this state.
    pub fn can_start_sync(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::RetryWait)
    }
}

/// Counters accumulated across sync cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Total number of conflicts resolved.
    pub conflicts: u64,
    /// Total number of retries taken.
    pub retries: u64,
    /// Completion time of the last successful cycle, epoch millis.
    pub last_sync_millis: Option<u64>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// A point-in-time status report.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    /// Current engine state.
    pub state: SyncState,
    /// Current connectivity.
    pub online: bool,
    /// Number of queued pending items.
    pub pending_changes: usize,
    /// Total conflicts resolved so far.
    pub conflicts: u64,
    /// Last error message, if any.
    pub last_error: Option<String>,
}

/// Result of one sync cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncCycleReport {
    /// Queued items delivered during the cycle.
    pub flushed: usize,
    /// Whether a snapshot was pushed to the server.
    pub pushed: bool,
    /// Whether a snapshot was pulled from the server.
    pub pulled: bool,
    /// Whether a conflict was resolved.
    pub conflict_resolved: bool,
    /// Duration of the cycle.
    pub duration: Duration,
}

/// Owns one logical store's snapshot lifecycle across network state
/// transitions.
///
/// Every local save lands in the offline cache immediately; the network
/// push never blocks the save and its failures surface only through
/// events and the sync-cycle result. A sync cycle flushes queued items,
/// fetches the server token, compares checksums, and reconciles
/// divergence through the configured conflict strategy.
///
/// One engine instance owns one store identifier. Concurrent writers to
/// the same identifier are expected to serialize at the call site.
pub struct SyncEngine<T: SyncTransport> {
    config: SyncConfig,
    pub(crate) transport: Arc<T>,
    cache: CacheManager,
    watcher: Arc<ConnectivityWatcher>,
    snapshot: RwLock<Option<Snapshot>>,
    pending: Mutex<VecDeque<PendingSyncItem>>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    listeners: ListenerSet<SyncEvent>,
}

impl<T: SyncTransport> SyncEngine<T> {
    /// Creates a sync engine, restoring any snapshot the cache holds
    /// for the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the cached snapshot exists but cannot be
    /// decoded.
    pub fn new(
        config: SyncConfig,
        transport: T,
        cache: CacheManager,
        watcher: Arc<ConnectivityWatcher>,
    ) -> SyncResult<Self> {
        let snapshot = hydrate(&config, &cache)?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
            cache,
            watcher,
            snapshot: RwLock::new(snapshot),
            pending: Mutex::new(VecDeque::new()),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            listeners: ListenerSet::new(),
        })
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the connectivity watcher.
    pub fn watcher(&self) -> &Arc<ConnectivityWatcher> {
        &self.watcher
    }

    /// Returns the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Returns a copy of the accumulated stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns a point-in-time status report.
    pub fn status(&self) -> SyncStatus {
        let stats = self.stats.read();
        SyncStatus {
            state: self.state(),
            online: self.watcher.is_online(),
            pending_changes: self.pending.lock().len(),
            conflicts: stats.conflicts,
            last_error: stats.last_error.clone(),
        }
    }

    /// Returns the number of queued pending items.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns a copy of the current snapshot, if any.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Registers a sync event listener and returns its unregister
    /// handle.
    pub fn register_listener(
        &self,
        listener: impl Fn(&SyncEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.listeners.register(listener)
    }

    /// Saves a new state value for the store.
    ///
    /// The offline cache is written first and its errors surface here.
    /// When online, one push is attempted; a push failure is downgraded
    /// to a queued upload and an error event, never an error return.
    /// When offline, the upload is queued directly.
    ///
    /// # Errors
    ///
    /// Returns local serialization, codec, or cache errors.
    pub fn save<V: Serialize>(&self, value: &V) -> SyncResult<()> {
        let data =
            serde_json::to_value(value).map_err(|e| SyncError::Serialization(e.to_string()))?;

        let snapshot = {
            let current = self.snapshot.read();
            match current.as_ref() {
                Some(previous) => previous.succeed(data),
                None => {
                    let mut snapshot = Snapshot::new(data, self.config.client_id.clone())
                        .with_encrypted(self.config.encrypt);
                    if let Some(user_id) = &self.config.user_id {
                        snapshot = snapshot.with_user_id(user_id.clone());
                    }
                    snapshot
                }
            }
        };

        self.persist_local(&snapshot)?;
        *self.snapshot.write() = Some(snapshot.clone());

        if self.watcher.is_online() {
            if let Err(e) = self.push_snapshot(&snapshot) {
                debug!(error = %e, "push after save failed, queueing upload");
                self.enqueue_upload(&snapshot);
                self.record_error(&e);
            }
        } else {
            self.enqueue_upload(&snapshot);
        }

        Ok(())
    }

    /// Returns the current state value, if any.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the snapshot data does not
    /// match the requested type.
    pub fn load<V: DeserializeOwned>(&self) -> SyncResult<Option<V>> {
        match self.snapshot.read().as_ref() {
            Some(snapshot) => serde_json::from_value(snapshot.data.clone())
                .map(Some)
                .map_err(|e| SyncError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Runs one sync cycle: flush queued items, then pull, compare and
    /// reconcile.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadySyncing`] when a cycle is running,
    /// a non-retryable [`SyncError::Network`] when offline (the queued
    /// download is delivered on reconnect), and network or codec errors
    /// from the cycle itself.
    pub fn sync(&self) -> SyncResult<SyncCycleReport> {
        if !self.watcher.is_online() {
            self.enqueue_download();
            return Err(SyncError::network_fatal("offline"));
        }

        self.begin_cycle()?;
        self.listeners.emit(&SyncEvent::SyncStarted);
        let started = Instant::now();

        let result = self.run_cycle();
        *self.state.write() = SyncState::Idle;

        match result {
            Ok(mut report) => {
                report.duration = started.elapsed();
                {
                    let mut stats = self.stats.write();
                    stats.cycles_completed += 1;
                    stats.last_sync_millis = Some(now_millis());
                    stats.last_error = None;
                }
                self.listeners.emit(&SyncEvent::SyncCompleted {
                    flushed: report.flushed,
                    conflict_resolved: report.conflict_resolved,
                });
                Ok(report)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Runs a sync cycle, retrying retryable failures with exponential
    /// backoff (`2^retryCount` seconds by default, capped).
    ///
    /// After the attempt ceiling the engine returns to idle and
    /// surfaces the last error; no further automatic retries run until
    /// the next trigger.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or
    /// [`SyncError::RetriesExhausted`].
    pub fn sync_with_retry(&self) -> SyncResult<SyncCycleReport> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut retry_count = 0u32;

        loop {
            match self.sync() {
                Ok(report) => return Ok(report),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= max_attempts {
                        let err = SyncError::RetriesExhausted {
                            attempts: max_attempts,
                            last_error: e.to_string(),
                        };
                        self.record_error(&err);
                        return Err(err);
                    }

                    let delay = self.config.retry.delay_for_retry(retry_count - 1);
                    debug!(retry_count, ?delay, "sync failed, waiting before retry");
                    *self.state.write() = SyncState::RetryWait;
                    self.stats.write().retries += 1;
                    std::thread::sleep(delay);
                }
            }
        }
    }

    /// Wires an engine to its connectivity watcher.
    ///
    /// Going offline emits [`SyncEvent::Offline`] and suspends
    /// proactive pushes. Coming online emits [`SyncEvent::Online`] and
    /// schedules a sync after the configured settle delay, so a burst
    /// of reconnecting stores does not stampede the server.
    pub fn attach_connectivity(engine: &Arc<Self>) -> ListenerHandle
    where
        T: 'static,
    {
        let weak = Arc::downgrade(engine);
        engine.watcher.register(move |event| {
            let Some(engine) = weak.upgrade() else {
                return;
            };
            match event {
                ConnectivityEvent::Offline => {
                    engine.listeners.emit(&SyncEvent::Offline);
                }
                ConnectivityEvent::Online => {
                    engine.listeners.emit(&SyncEvent::Online);
                    let engine = Arc::clone(&engine);
                    std::thread::spawn(move || {
                        std::thread::sleep(engine.config.settle_delay);
                        if !engine.watcher.is_online() {
                            return;
                        }
                        if let Err(e) = engine.sync_with_retry() {
                            debug!(error = %e, "reconnect sync failed");
                        }
                    });
                }
            }
        })
    }

    fn begin_cycle(&self) -> SyncResult<()> {
        let mut state = self.state.write();
        if !state.can_start_sync() {
            return Err(SyncError::AlreadySyncing);
        }
        *state = SyncState::Syncing;
        Ok(())
    }

    fn run_cycle(&self) -> SyncResult<SyncCycleReport> {
        let mut report = SyncCycleReport {
            flushed: self.flush_pending()?,
            ..Default::default()
        };

        let remote_token = self.transport.fetch(&self.config.store_id)?;
        let local = self.snapshot.read().clone();

        match (local, remote_token) {
            (None, None) => {}
            (Some(local), None) => {
                self.push_snapshot(&local)?;
                report.pushed = true;
            }
            (None, Some(token)) => {
                let remote = self.decode_snapshot(&token)?;
                self.persist_local(&remote)?;
                *self.snapshot.write() = Some(remote);
                report.pulled = true;
            }
            (Some(local), Some(token)) => {
                let remote = self.decode_snapshot(&token)?;
                report.pulled = true;

                if local.is_equivalent(&remote) {
                    debug!("checksums match, nothing to reconcile");
                } else {
                    let resolved = self.config.strategy.resolve(&local, &remote);
                    debug!(
                        strategy = ?self.config.strategy,
                        version = resolved.version,
                        "resolved snapshot conflict"
                    );
                    self.stats.write().conflicts += 1;
                    self.listeners.emit(&SyncEvent::Conflict {
                        client: local.data.clone(),
                        server: remote.data.clone(),
                        resolved: resolved.data.clone(),
                    });

                    self.persist_local(&resolved)?;
                    *self.snapshot.write() = Some(resolved.clone());
                    self.push_snapshot(&resolved)?;
                    report.pushed = true;
                    report.conflict_resolved = true;
                }
            }
        }

        Ok(report)
    }

    /// Delivers queued items: one push per queued upload. Items that
    /// fail with retry attempts left are requeued; exhausted items are
    /// dropped with a warning.
    fn flush_pending(&self) -> SyncResult<usize> {
        let items: Vec<PendingSyncItem> = self.pending.lock().drain(..).collect();
        if items.is_empty() {
            return Ok(0);
        }

        let mut delivered = 0usize;
        let mut first_error: Option<SyncError> = None;

        for mut item in items {
            let outcome = match item.operation {
                PendingOperation::Upload => self.deliver_upload(&item),
                // The pull phase of this very cycle is the download.
                PendingOperation::Download => Ok(()),
            };

            match outcome {
                Ok(()) => delivered += 1,
                Err(e) => {
                    item.record_failure();
                    if item.retries >= self.config.retry.max_attempts {
                        warn!(
                            store = %item.store_id,
                            retries = item.retries,
                            "dropping pending item after exhausted retries"
                        );
                    } else {
                        self.pending.lock().push_back(item);
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    fn deliver_upload(&self, item: &PendingSyncItem) -> SyncResult<()> {
        let snapshot: Snapshot = serde_json::from_value(item.data.clone())
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        self.push_snapshot(&snapshot).map(|_| ())
    }

    fn push_snapshot(&self, snapshot: &Snapshot) -> SyncResult<PushResponse> {
        let token = self.encode_snapshot(snapshot)?;
        let request = PushRequest::new(token, snapshot);
        let response = self.transport.push(&self.config.store_id, &request)?;

        if response.conflict {
            if let Some(resolved_token) = response.resolved_token.as_deref() {
                // The server resolved on its side; adopt its result.
                let resolved = self.decode_snapshot(resolved_token)?;
                self.persist_local(&resolved)?;
                *self.snapshot.write() = Some(resolved);
            }
            // Without a resolved token, the next pull reconciles.
        }

        Ok(response)
    }

    fn persist_local(&self, snapshot: &Snapshot) -> SyncResult<()> {
        self.cache
            .save(&self.config.store_id, snapshot, &self.cache_options())?;
        Ok(())
    }

    fn encode_snapshot(&self, snapshot: &Snapshot) -> SyncResult<String> {
        let value = serde_json::to_value(snapshot)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        let options = EncodeOptions {
            compress: self.config.compress,
            encrypt: self.config.encrypt,
            password: self.config.password.clone(),
            format_version: None,
        };
        Ok(snapsync_codec::encode(&value, &options)?)
    }

    fn decode_snapshot(&self, token: &str) -> SyncResult<Snapshot> {
        let options = DecodeOptions {
            password: self.config.password.clone(),
            strict_version: true,
        };
        let value = snapsync_codec::decode(token, &options)?;
        serde_json::from_value(value).map_err(|e| SyncError::Serialization(e.to_string()))
    }

    fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            ttl: self.config.cache_ttl,
            compress: self.config.compress,
            encrypt: self.config.encrypt,
            password: self.config.password.clone(),
        }
    }

    fn enqueue_upload(&self, snapshot: &Snapshot) {
        match serde_json::to_value(snapshot) {
            Ok(data) => {
                let mut pending = self.pending.lock();
                pending.push_back(PendingSyncItem::upload(self.config.store_id.as_str(), data));
                debug!(queued = pending.len(), "queued upload");
            }
            Err(e) => warn!(error = %e, "could not queue upload"),
        }
    }

    fn enqueue_download(&self) {
        let mut pending = self.pending.lock();
        let already_queued = pending
            .iter()
            .any(|item| item.operation == PendingOperation::Download);
        if !already_queued {
            pending.push_back(PendingSyncItem::download(self.config.store_id.as_str()));
        }
    }

    fn record_error(&self, error: &SyncError) {
        self.stats.write().last_error = Some(error.to_string());
        self.listeners.emit(&SyncEvent::Error {
            message: error.to_string(),
        });
    }
}

/// Restores the store's snapshot from the cache, if present.
///
/// Records written before snapshot metadata existed hold the bare state
/// value; those are wrapped into a fresh snapshot.
fn hydrate(config: &SyncConfig, cache: &CacheManager) -> SyncResult<Option<Snapshot>> {
    let options = CacheOptions {
        ttl: config.cache_ttl,
        compress: config.compress,
        encrypt: config.encrypt,
        password: config.password.clone(),
    };
    let Some(value) = cache.load_value(&config.store_id, &options)? else {
        return Ok(None);
    };

    match serde_json::from_value::<Snapshot>(value.clone()) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(_) => {
            debug!(store = %config.store_id, "wrapping legacy cached value into a snapshot");
            let mut snapshot =
                Snapshot::new(value, config.client_id.clone()).with_encrypted(config.encrypt);
            if let Some(user_id) = &config.user_id {
                snapshot = snapshot.with_user_id(user_id.clone());
            }
            Ok(Some(snapshot))
        }
    }
}
