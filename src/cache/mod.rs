//! Caching subsystem.
//!
//! Two layers:
//!
//! - [`ResourceCache`] — in-memory snapshots of resolved payloads, shared
//!   across controllers through an `Arc`. Freshness is decided at read time
//!   against the caller's TTL, so controllers with different TTLs can share
//!   one cache.
//!
//! - [`PersistedCache`] — optional key-value persistence that survives
//!   process restarts (one JSON file per key by default). Entries carry
//!   their own timestamp and are treated as absent once older than the
//!   configured max age. Read and write failures are logged and swallowed.

pub mod persisted;
pub mod store;

pub use persisted::{Persisted, PersistedCache};
pub use store::{FileStore, KeyValueStore, MemoryStore};

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Default maximum number of entries in a [`ResourceCache`].
pub const DEFAULT_CACHE_MAX: u64 = 1_000;

/// Immutable snapshot of the last successful resolution for a key.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Snapshot taken now.
    pub fn new(key: impl Into<String>, payload: T) -> Self {
        Self {
            key: key.into(),
            payload,
            fetched_at: Instant::now(),
        }
    }

    /// Snapshot that was taken `age` ago.
    pub fn aged(key: impl Into<String>, payload: T, age: Duration) -> Self {
        let now = Instant::now();
        Self {
            key: key.into(),
            payload,
            fetched_at: now.checked_sub(age).unwrap_or(now),
        }
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Valid for reuse only while `now - fetched_at < ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Thread-safe store of resolved payloads keyed by resource signature.
///
/// Bounded LRU (moka) so long-running processes don't grow without limit.
/// Entries are only ever replaced wholesale: the last completed write for a
/// key wins. Build one per payload type and hand the same `Arc` to every
/// controller that should share results.
pub struct ResourceCache<T> {
    entries: moka::sync::Cache<String, CacheEntry<T>>,
}

impl<T> ResourceCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty cache with the default max capacity (1,000).
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_CACHE_MAX)
    }

    /// Create a cache with a custom max capacity.
    pub fn with_max_entries(max: u64) -> Self {
        Self {
            entries: moka::sync::Cache::new(max),
        }
    }

    /// Look up an entry regardless of its age.
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entries.get(key)
    }

    /// Look up a payload that is still within `ttl`.
    ///
    /// Expired entries are treated as absent but left in place; a caller
    /// with a longer TTL may still use them. Emits cache hit/miss metrics.
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<T> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(ttl) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "source" => "memory").increment(1);
                Some(entry.payload)
            }
            Some(entry) => {
                debug!(key, age_ms = entry.age().as_millis() as u64, "cache entry expired");
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert (or overwrite) a payload fetched now.
    pub fn insert(&self, key: impl Into<String>, payload: T) {
        self.insert_entry(CacheEntry::new(key, payload));
    }

    /// Insert (or overwrite) a prepared snapshot.
    pub fn insert_entry(&self, entry: CacheEntry<T>) {
        self.entries.insert(entry.key.clone(), entry);
    }

    /// Remove the entry for `key`, if any.
    pub fn invalidate(&self, key: &str) {
        self.entries.invalidate(key);
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Number of entries currently in the cache.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ResourceCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_freshness() {
        let entry = CacheEntry::aged("k", 1u8, Duration::from_secs(10));
        assert!(entry.is_fresh(Duration::from_secs(60)));
        assert!(!entry.is_fresh(Duration::from_secs(5)));
    }

    #[test]
    fn zero_ttl_is_never_fresh() {
        let entry = CacheEntry::new("k", 1u8);
        assert!(!entry.is_fresh(Duration::ZERO));
    }

    #[test]
    fn get_fresh_respects_caller_ttl() {
        let cache = ResourceCache::new();
        cache.insert_entry(CacheEntry::aged("equip-list", "cranes", Duration::from_secs(30)));

        assert_eq!(cache.get_fresh("equip-list", Duration::from_secs(60)), Some("cranes"));
        assert_eq!(cache.get_fresh("equip-list", Duration::from_secs(10)), None);
        // Expired for one caller, still stored for others.
        assert!(cache.get("equip-list").is_some());
    }
}
