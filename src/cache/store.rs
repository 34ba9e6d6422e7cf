//! Key-value stores backing [`PersistedCache`](super::PersistedCache).
//!
//! [`FileStore`] keeps one JSON document per key under a cache directory
//! (default: `~/.cache/huginn/`), written atomically via tmp + rename.
//! [`MemoryStore`] is the in-process equivalent, mostly for tests and for
//! callers that want persistence semantics without touching disk.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::types::key_digest;
use crate::{HuginnError, Result};

/// Minimal persistence contract: string keys to string (JSON) values.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for `key`. `Ok(None)` when absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| HuginnError::CacheRead("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| HuginnError::CacheWrite("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| HuginnError::CacheWrite("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// File-backed [`KeyValueStore`]: one `<key>.json` file per entry.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the platform cache directory (`~/.cache/huginn/`).
    pub fn in_default_dir() -> Self {
        Self::new(default_cache_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    ///
    /// Keys that are not plain file names are sanitised and suffixed with
    /// their hash so distinct keys never share a file.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        let name = if safe {
            key.to_string()
        } else {
            let sanitised: String = key
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .take(64)
                .collect();
            format!("{sanitised}-{}", key_digest(key))
        };
        self.dir.join(format!("{name}.json"))
    }
}

/// Default persistence directory: `~/.cache/huginn`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("huginn")
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HuginnError::CacheRead(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            HuginnError::CacheWrite(format!(
                "failed to create cache dir {}: {e}",
                self.dir.display()
            ))
        })?;

        // Write to tmp file first, then rename for atomicity
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value).map_err(|e| {
            HuginnError::CacheWrite(format!(
                "failed to write cache file {}: {e}",
                tmp_path.display()
            ))
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            HuginnError::CacheWrite(format!(
                "failed to rename cache file {} → {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HuginnError::CacheWrite(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}
