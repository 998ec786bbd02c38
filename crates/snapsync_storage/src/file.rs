//! File-based storage backend: one JSON file per record.

use crate::backend::{namespaced, strip_namespace, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::record::StoredRecord;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The simple durable store: each record lives in its own JSON file.
///
/// File names are URL-safe base64 of the namespaced key, so arbitrary
/// caller keys are safe. Writes go through a temp file and a rename.
///
/// # Thread Safety
///
/// A single write lock serializes mutations; reads of distinct keys do
/// not contend with each other beyond the filesystem itself.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

const RECORD_EXT: &str = "json";

impl FileBackend {
    /// Opens or creates a file backend rooted at the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the backing directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let encoded = URL_SAFE_NO_PAD.encode(namespaced(key));
        self.dir.join(format!("{encoded}.{RECORD_EXT}"))
    }

    fn decode_file_name(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        let bytes = URL_SAFE_NO_PAD.decode(stem).ok()?;
        let physical = String::from_utf8(bytes).ok()?;
        strip_namespace(&physical).map(String::from)
    }

    fn read_record(&self, path: &Path) -> StorageResult<Option<StoredRecord>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record = serde_json::from_str(&text)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Some(record))
    }

    fn write_record(&self, path: &Path, record: &StoredRecord) -> StorageResult<()> {
        let text =
            serde_json::to_string(record).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let _guard = self.write_lock.lock();
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> StorageResult<Option<StoredRecord>> {
        let path = self.record_path(key);
        match self.read_record(&path)? {
            Some(record) if record.is_expired() => {
                let _guard = self.write_lock.lock();
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn set(&self, key: &str, payload: String, ttl: Option<Duration>) -> StorageResult<()> {
        let record = StoredRecord::new(payload, ttl);
        self.write_record(&self.record_path(key), &record)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT)
                && self.decode_file_name(&path).is_some()
            {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(key) = self.decode_file_name(&path) else {
                continue;
            };
            if let Some(record) = self.read_record(&path)? {
                if !record.is_expired() {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}
