//! Persisted payloads with their own timestamps.
//!
//! Values are stored as a small JSON envelope:
//!
//! ```json
//! { "stored_at_ms": 1760000000000, "value": { ... } }
//! ```
//!
//! `stored_at_ms` is wall-clock milliseconds since the Unix epoch, so the age
//! survives restarts. Entries older than the configured max age, entries
//! that fail to parse, and store read failures all read as "absent": the
//! caller falls back to the network and never sees the error.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{FileStore, KeyValueStore};
use crate::telemetry;
use crate::{HuginnError, Result};

/// Default max age for persisted entries: 24 hours.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    stored_at_ms: u64,
    value: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    stored_at_ms: u64,
    value: T,
}

/// A value read back from persistence, with how old it is.
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<T> {
    pub value: T,
    pub age: Duration,
}

/// Timestamped persistence on top of any [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistedCache {
    store: Arc<dyn KeyValueStore>,
    max_age: Duration,
}

impl PersistedCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// File-backed persistence in the platform cache directory.
    pub fn in_default_dir() -> Self {
        Self::new(Arc::new(FileStore::in_default_dir()))
    }

    /// Set how long a persisted entry stays usable.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn max_age_limit(&self) -> Duration {
        self.max_age
    }

    /// Read `key`, surfacing read and parse failures as `CacheRead`.
    ///
    /// Expired entries are `Ok(None)`.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Persisted<T>>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        let envelope: Envelope<T> = serde_json::from_str(&raw)
            .map_err(|e| HuginnError::CacheRead(format!("corrupt entry for {key}: {e}")))?;

        let age = Duration::from_millis(now_ms().saturating_sub(envelope.stored_at_ms));
        if age >= self.max_age {
            debug!(key, age_ms = age.as_millis() as u64, "persisted entry expired");
            return Ok(None);
        }
        Ok(Some(Persisted {
            value: envelope.value,
            age,
        }))
    }

    /// Read `key`, treating every failure as a miss.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<Persisted<T>> {
        match self.try_load(key) {
            Ok(Some(entry)) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "source" => "persisted")
                    .increment(1);
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable persisted entry");
                metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "read")
                    .increment(1);
                None
            }
        }
    }

    /// Write `value` under `key`, surfacing failures.
    pub fn try_store<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.try_store_at(key, value, now_ms())
    }

    /// Write `value` as if it had been stored at `stored_at_ms`.
    pub fn try_store_at<T: Serialize>(&self, key: &str, value: &T, stored_at_ms: u64) -> Result<()> {
        let json = serde_json::to_string(&EnvelopeRef {
            stored_at_ms,
            value,
        })
        .map_err(|e| HuginnError::CacheWrite(format!("failed to serialize entry for {key}: {e}")))?;
        self.store.set(key, &json)
    }

    /// Write `value` under `key`, logging failures.
    pub fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_store(key, value) {
            warn!(key, error = %e, "failed to persist entry");
            metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "write").increment(1);
        }
    }

    /// Delete `key`, logging failures.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "failed to remove persisted entry");
            metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "remove").increment(1);
        }
    }
}

/// Type-erased persistence as seen by a controller for payload type `T`.
pub(crate) trait PayloadPersistence<T>: Send + Sync {
    fn load(&self, key: &str) -> Option<Persisted<T>>;
    fn store(&self, key: &str, value: &T);
    fn remove(&self, key: &str);
}

impl<T> PayloadPersistence<T> for PersistedCache
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self, key: &str) -> Option<Persisted<T>> {
        PersistedCache::load(self, key)
    }

    fn store(&self, key: &str, value: &T) {
        PersistedCache::store(self, key, value);
    }

    fn remove(&self, key: &str) {
        PersistedCache::remove(self, key);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    fn persisted() -> (PersistedCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (PersistedCache::new(store.clone()), store)
    }

    #[test]
    fn store_then_load() {
        let (cache, _) = persisted();
        cache.store("equip-list", &vec!["excavator", "crane"]);
        let loaded: Persisted<Vec<String>> = cache.load("equip-list").unwrap();
        assert_eq!(loaded.value, vec!["excavator", "crane"]);
        assert!(loaded.age < Duration::from_secs(5));
    }

    #[test]
    fn missing_key_is_none() {
        let (cache, _) = persisted();
        assert!(cache.load::<u32>("missing").is_none());
    }

    #[test]
    fn expired_entry_is_absent() {
        let (cache, _) = persisted();
        let cache = cache.max_age(Duration::from_secs(60));
        let two_minutes_ago = now_ms() - 120_000;
        cache.try_store_at("old", &1u32, two_minutes_ago).unwrap();
        assert!(cache.load::<u32>("old").is_none());
        assert!(cache.try_load::<u32>("old").unwrap().is_none());
    }

    #[test]
    fn corrupt_entry_is_cache_read_error_and_absent() {
        let (cache, store) = persisted();
        store.set("bad", "{not json").unwrap();
        let err = cache.try_load::<u32>("bad").unwrap_err();
        assert!(matches!(err, HuginnError::CacheRead(_)));
        assert!(cache.load::<u32>("bad").is_none());
    }

    #[test]
    fn wrong_shape_is_absent() {
        let (cache, _) = persisted();
        cache.store("k", &"text");
        assert!(cache.load::<u32>("k").is_none());
    }

    #[test]
    fn remove_deletes_entry() {
        let (cache, store) = persisted();
        cache.store("k", &1u32);
        cache.remove("k");
        assert!(store.is_empty());
    }

    #[test]
    fn envelope_format() {
        let (cache, store) = persisted();
        cache.try_store_at("k", &5u32, 1_000).unwrap();
        let raw = store.get("k").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["stored_at_ms"], 1_000);
        assert_eq!(json["value"], 5);
    }
}
