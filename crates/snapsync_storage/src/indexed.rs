//! Log-structured storage backend with an in-memory index.

use crate::backend::{namespaced, strip_namespace, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::record::StoredRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One entry in the append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum LogEntry {
    /// A record was written.
    Set {
        /// Physical (namespaced) key.
        key: String,
        /// The record.
        record: StoredRecord,
    },
    /// A record was deleted.
    Delete {
        /// Physical (namespaced) key.
        key: String,
    },
    /// Everything was deleted.
    Clear,
}

/// Interior state guarded by one lock: the index and the log writer.
#[derive(Debug)]
struct IndexedState {
    index: HashMap<String, StoredRecord>,
    writer: File,
    /// Log entries that no longer contribute to the index.
    dead: usize,
}

/// The durable indexed store: an append-only JSON-line log replayed
/// into an in-memory index on open.
///
/// The most capable tier of the fallback chain. Every mutation is a
/// single appended line; once dead entries outnumber live ones the log
/// is compacted by rewriting it from the index.
///
/// # Thread Safety
///
/// This backend is thread-safe; one lock guards index and log writer
/// together so they can never diverge.
#[derive(Debug)]
pub struct IndexedBackend {
    log_path: PathBuf,
    state: Mutex<IndexedState>,
}

/// Compaction triggers once the log holds this many dead entries and
/// they outnumber the live ones.
const COMPACT_MIN_DEAD: usize = 64;

impl IndexedBackend {
    /// Opens or creates an indexed backend rooted at the given directory.
    ///
    /// The log is replayed to rebuild the index; unparseable lines fail
    /// the open with [`StorageError::Corrupted`] rather than being
    /// silently dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or log cannot be opened or the
    /// log is corrupted.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        let log_path = dir.join("records.log");

        let mut index = HashMap::new();
        let mut total = 0usize;

        if log_path.exists() {
            let reader = BufReader::new(File::open(&log_path)?);
            for line in reader.lines() {
                let line = line?;
                if line.is_empty() {
                    continue;
                }
                total += 1;
                let entry: LogEntry = serde_json::from_str(&line)
                    .map_err(|e| StorageError::Corrupted(format!("bad log line: {e}")))?;
                match entry {
                    LogEntry::Set { key, record } => {
                        index.insert(key, record);
                    }
                    LogEntry::Delete { key } => {
                        index.remove(&key);
                    }
                    LogEntry::Clear => index.clear(),
                }
            }
        }

        let writer = OpenOptions::new().create(true).append(true).open(&log_path)?;
        let dead = total.saturating_sub(index.len());

        Ok(Self {
            log_path,
            state: Mutex::new(IndexedState {
                index,
                writer,
                dead,
            }),
        })
    }

    /// Returns the path of the backing log file.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Returns the number of dead log entries, for tests.
    #[must_use]
    pub fn dead_entries(&self) -> usize {
        self.state.lock().dead
    }

    fn append(&self, state: &mut IndexedState, entry: &LogEntry) -> StorageResult<()> {
        let mut line =
            serde_json::to_string(entry).map_err(|e| StorageError::Serialization(e.to_string()))?;
        line.push('\n');
        state.writer.write_all(line.as_bytes())?;
        state.writer.flush()?;
        Ok(())
    }

    fn maybe_compact(&self, state: &mut IndexedState) -> StorageResult<()> {
        if state.dead < COMPACT_MIN_DEAD || state.dead <= state.index.len() {
            return Ok(());
        }
        self.compact_locked(state)
    }

    fn compact_locked(&self, state: &mut IndexedState) -> StorageResult<()> {
        let tmp_path = self.log_path.with_extension("log.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for (key, record) in &state.index {
                let entry = LogEntry::Set {
                    key: key.clone(),
                    record: record.clone(),
                };
                let mut line = serde_json::to_string(&entry)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                line.push('\n');
                tmp.write_all(line.as_bytes())?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.log_path)?;

        state.writer = OpenOptions::new().append(true).open(&self.log_path)?;
        state.dead = 0;
        tracing::debug!(path = %self.log_path.display(), "compacted storage log");
        Ok(())
    }
}

impl StorageBackend for IndexedBackend {
    fn name(&self) -> &'static str {
        "indexed"
    }

    fn get(&self, key: &str) -> StorageResult<Option<StoredRecord>> {
        let physical = namespaced(key);
        let mut state = self.state.lock();

        match state.index.get(&physical).cloned() {
            Some(record) if record.is_expired() => {
                state.index.remove(&physical);
                state.dead += 1;
                let entry = LogEntry::Delete { key: physical };
                self.append(&mut state, &entry)?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn set(&self, key: &str, payload: String, ttl: Option<Duration>) -> StorageResult<()> {
        let physical = namespaced(key);
        let record = StoredRecord::new(payload, ttl);
        let mut state = self.state.lock();

        if state.index.insert(physical.clone(), record.clone()).is_some() {
            state.dead += 1;
        }
        let entry = LogEntry::Set {
            key: physical,
            record,
        };
        self.append(&mut state, &entry)?;
        self.maybe_compact(&mut state)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let physical = namespaced(key);
        let mut state = self.state.lock();

        if state.index.remove(&physical).is_none() {
            return Ok(());
        }
        state.dead += 2; // the set line and the delete line
        let entry = LogEntry::Delete { key: physical };
        self.append(&mut state, &entry)?;
        self.maybe_compact(&mut state)
    }

    fn clear(&self) -> StorageResult<()> {
        let mut state = self.state.lock();
        state.index.clear();
        state.dead = 0;
        self.append(&mut state, &LogEntry::Clear)?;
        self.compact_locked(&mut state)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .index
            .iter()
            .filter(|(_, record)| !record.is_expired())
            .filter_map(|(key, _)| strip_namespace(key).map(String::from))
            .collect())
    }
}
