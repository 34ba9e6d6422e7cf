//! Persisted entries: envelopes, expiry, corruption and controller hydration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use huginn::{
    AbortSignal, FetchController, FetchOptions, FileStore, FnTransport, HuginnError,
    KeyValueStore, MemoryStore, PersistedCache, RequestSpec, RequestStatus, Transport,
};

type Equipment = Vec<String>;

fn counting_transport(calls: Arc<AtomicU32>) -> Arc<dyn Transport<Equipment>> {
    Arc::new(FnTransport::new(
        move |_spec: RequestSpec, _signal: AbortSignal| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<Equipment, HuginnError>(vec!["excavator".into(), "crane".into()])
            }
        },
    ))
}

fn controller(
    persistence: &PersistedCache,
    calls: &Arc<AtomicU32>,
) -> FetchController<Equipment> {
    FetchController::<Equipment>::builder()
        .transport(counting_transport(calls.clone()))
        .persistence(persistence.clone())
        .build()
        .unwrap()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

fn spec() -> RequestSpec {
    RequestSpec::new("/api/equipment")
}

fn options() -> FetchOptions {
    FetchOptions::new().ttl(Duration::from_secs(5))
}

// ============================================================================
// PersistedCache
// ============================================================================

#[test]
fn envelope_carries_timestamp_and_value() {
    let store = Arc::new(MemoryStore::new());
    let cache = PersistedCache::new(store.clone());
    cache.try_store_at("equip-list", &vec!["crane"], 1_000).unwrap();

    let raw = store.get("equip-list").unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["stored_at_ms"], 1_000);
    assert_eq!(json["value"], serde_json::json!(["crane"]));
}

#[test]
fn entries_past_max_age_read_as_absent() {
    let store = Arc::new(MemoryStore::new());
    let cache = PersistedCache::new(store).max_age(Duration::from_secs(60));
    cache
        .try_store_at("equip-list", &vec!["crane"], now_ms() - 120_000)
        .unwrap();

    let loaded = cache.try_load::<Equipment>("equip-list").unwrap();
    assert!(loaded.is_none());
}

#[test]
fn corrupt_entry_is_cache_read_error() {
    let store = Arc::new(MemoryStore::new());
    store.set("equip-list", "{not json").unwrap();
    let cache = PersistedCache::new(store);

    let err = cache.try_load::<Equipment>("equip-list").unwrap_err();
    assert!(matches!(err, HuginnError::CacheRead(_)));
    // The lenient path swallows it
    assert!(cache.load::<Equipment>("equip-list").is_none());
}

#[test]
fn wrong_payload_shape_is_cache_read_error() {
    let store = Arc::new(MemoryStore::new());
    let cache = PersistedCache::new(store);
    cache.store("equip-list", &42u32);

    let err = cache.try_load::<Equipment>("equip-list").unwrap_err();
    assert!(matches!(err, HuginnError::CacheRead(_)));
}

#[test]
fn file_store_survives_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    let first = PersistedCache::new(Arc::new(FileStore::new(dir.path())));
    first.store("equip-list", &vec!["crane"]);

    let second = PersistedCache::new(Arc::new(FileStore::new(dir.path())));
    let loaded = second.load::<Equipment>("equip-list").unwrap();
    assert_eq!(loaded.value, vec!["crane"]);
}

// ============================================================================
// Controller integration
// ============================================================================

#[tokio::test]
async fn resolved_payload_is_persisted() {
    let persistence = PersistedCache::new(Arc::new(MemoryStore::new()));
    let calls = Arc::new(AtomicU32::new(0));
    let controller = controller(&persistence, &calls);

    controller.trigger("equip-list", spec(), &options());
    assert_eq!(controller.settled().await.status, RequestStatus::Success);

    let loaded = persistence.load::<Equipment>("equip-list").unwrap();
    assert_eq!(loaded.value, vec!["excavator", "crane"]);
}

#[tokio::test]
async fn fresh_persisted_entry_hydrates_new_controller() {
    let persistence = PersistedCache::new(Arc::new(MemoryStore::new()));
    persistence.store("equip-list", &vec!["bulldozer".to_string()]);

    let calls = Arc::new(AtomicU32::new(0));
    let controller = controller(&persistence, &calls);
    controller.trigger("equip-list", spec(), &options());

    let state = controller.state();
    assert_eq!(state.status, RequestStatus::Success);
    assert_eq!(state.data, Some(vec!["bulldozer".to_string()]));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(controller.cache().get("equip-list").is_some());
}

#[tokio::test]
async fn persisted_entry_older_than_ttl_goes_to_network() {
    let persistence = PersistedCache::new(Arc::new(MemoryStore::new()));
    persistence
        .try_store_at("equip-list", &vec!["bulldozer"], now_ms() - 10_000)
        .unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    let controller = controller(&persistence, &calls);
    controller.trigger("equip-list", spec(), &options());

    assert_eq!(controller.state().status, RequestStatus::Loading);
    let state = controller.settled().await;
    assert_eq!(state.data, Some(vec!["excavator".into(), "crane".into()]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn corrupt_persisted_entry_is_replaced() {
    let store = Arc::new(MemoryStore::new());
    store.set("equip-list", "garbage").unwrap();
    let persistence = PersistedCache::new(store);

    let calls = Arc::new(AtomicU32::new(0));
    let controller = controller(&persistence, &calls);
    controller.trigger("equip-list", spec(), &options());
    assert_eq!(controller.settled().await.status, RequestStatus::Success);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(persistence.try_load::<Equipment>("equip-list").unwrap().is_some());
}

#[tokio::test]
async fn invalidate_removes_persisted_entry() {
    let store = Arc::new(MemoryStore::new());
    let persistence = PersistedCache::new(store.clone());
    let calls = Arc::new(AtomicU32::new(0));
    let controller = controller(&persistence, &calls);

    controller.trigger("equip-list", spec(), &options());
    controller.settled().await;
    assert_eq!(store.len(), 1);

    controller.invalidate("equip-list");
    assert!(store.is_empty());
}

#[tokio::test]
async fn mutate_writes_through() {
    let persistence = PersistedCache::new(Arc::new(MemoryStore::new()));
    let calls = Arc::new(AtomicU32::new(0));
    let controller = controller(&persistence, &calls);

    controller.mutate("equip-list", vec!["forklift".to_string()]);

    let loaded = persistence.load::<Equipment>("equip-list").unwrap();
    assert_eq!(loaded.value, vec!["forklift"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
