//! Fetch-cache-retry controller.
//!
//! A [`FetchController`] resolves one resource at a time into a value and
//! publishes its progress as a [`RequestState`]. It serves fresh cached
//! payloads without touching the network, retries transport failures with
//! exponential backoff, and can be cancelled at any point.
//!
//! # Ordering
//!
//! Every `trigger`/`refetch`/`cancel` bumps a generation counter and fires
//! the previous cycle's [`AbortSignal`]. A running cycle may only publish
//! state while its generation is current, and the check happens under the
//! same lock as the write, so a cancelled or superseded request can never
//! overwrite newer state.
//!
//! # Runtime
//!
//! `trigger` and `refetch` spawn onto the ambient tokio runtime and must be
//! called from within one.

mod builder;
mod task;

pub use builder::FetchControllerBuilder;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::Stream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::cache::persisted::PayloadPersistence;
use crate::cache::{CacheEntry, ResourceCache};
use crate::transport::{AbortSignal, Transport};
use crate::types::{FetchOptions, RequestSpec, RequestState, RequestStatus};
use task::ResolveTask;

/// Resolves a keyed resource through a cache, an injected transport and a
/// bounded retry loop.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use huginn::{FetchController, FetchOptions, HttpTransport, RequestSpec};
///
/// #[tokio::main]
/// async fn main() -> huginn::Result<()> {
///     let controller = FetchController::<serde_json::Value>::builder()
///         .transport(Arc::new(HttpTransport::<serde_json::Value>::new()?))
///         .build()?;
///
///     let spec = RequestSpec::new("https://example.com/api/equipment");
///     controller.trigger("equip-list", spec, &FetchOptions::default());
///
///     let state = controller.settled().await;
///     println!("{}: {:?}", state.status, state.data);
///     Ok(())
/// }
/// ```
pub struct FetchController<T> {
    transport: Arc<dyn Transport<T>>,
    cache: Arc<ResourceCache<T>>,
    persistence: Option<Arc<dyn PayloadPersistence<T>>>,
    shared: Arc<Shared<T>>,
}

/// State shared between the controller and its spawned cycle.
pub(crate) struct Shared<T> {
    inner: Mutex<Inner>,
    state: watch::Sender<RequestState<T>>,
}

#[derive(Default)]
struct Inner {
    generation: u64,
    signal: Option<AbortSignal>,
    task: Option<JoinHandle<()>>,
}

impl<T> Shared<T> {
    fn new(initial: Option<T>) -> Self {
        let (state, _) = watch::channel(RequestState::new(initial));
        Self {
            inner: Mutex::new(Inner::default()),
            state,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Abort whatever is in flight and open a new generation.
    fn supersede(&self) -> (u64, AbortSignal) {
        let mut inner = self.lock();
        Self::abort_locked(&mut inner);
        let signal = AbortSignal::new();
        inner.signal = Some(signal.clone());
        (inner.generation, signal)
    }

    /// Abort whatever is in flight. Returns whether anything was.
    fn cancel(&self) -> bool {
        let mut inner = self.lock();
        let was_running = inner.task.as_ref().is_some_and(|t| !t.is_finished());
        Self::abort_locked(&mut inner);
        was_running
    }

    fn abort_locked(inner: &mut Inner) {
        inner.generation += 1;
        if let Some(signal) = inner.signal.take() {
            signal.abort();
        }
        inner.task.take();
    }

    fn attach(&self, generation: u64, task: JoinHandle<()>) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.task = Some(task);
        }
    }

    fn in_flight(&self) -> bool {
        self.lock().task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Apply `f` to the state if `generation` is still current.
    pub(crate) fn publish(
        &self,
        generation: u64,
        f: impl FnOnce(&mut RequestState<T>),
    ) -> bool {
        let inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        self.state.send_modify(f);
        drop(inner);
        true
    }

    /// Apply `f` to the state unconditionally.
    fn modify(&self, f: impl FnOnce(&mut RequestState<T>)) {
        let _inner = self.lock();
        self.state.send_modify(f);
    }
}

impl<T> FetchController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start configuring a controller.
    pub fn builder() -> FetchControllerBuilder<T> {
        FetchControllerBuilder::new()
    }

    /// Controller over `transport` with a private cache and no persistence.
    pub fn new(transport: Arc<dyn Transport<T>>) -> Self {
        Self::from_parts(transport, Arc::new(ResourceCache::new()), None, None)
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport<T>>,
        cache: Arc<ResourceCache<T>>,
        persistence: Option<Arc<dyn PayloadPersistence<T>>>,
        initial_data: Option<T>,
    ) -> Self {
        Self {
            transport,
            cache,
            persistence,
            shared: Arc::new(Shared::new(initial_data)),
        }
    }

    /// Resolve `key`, serving a fresh cached payload when there is one.
    ///
    /// Any cycle already in flight on this controller is aborted first. On a
    /// cache hit the state becomes `Success` synchronously and no request is
    /// issued; otherwise the state becomes `Loading` and a cycle is spawned.
    /// Progress is observed through [`state()`](Self::state),
    /// [`subscribe()`](Self::subscribe) or [`settled()`](Self::settled).
    pub fn trigger(&self, key: impl Into<String>, spec: RequestSpec, options: &FetchOptions) {
        self.start(key.into(), spec, options, true);
    }

    /// Like [`trigger()`](Self::trigger), but always goes to the network.
    pub fn refetch(&self, key: impl Into<String>, spec: RequestSpec, options: &FetchOptions) {
        self.start(key.into(), spec, options, false);
    }

    fn start(&self, key: String, spec: RequestSpec, options: &FetchOptions, use_cache: bool) {
        let (generation, signal) = self.shared.supersede();

        if let Err(err) = options.validate() {
            self.shared.publish(generation, |state| {
                state.begin();
                state.fail(err);
            });
            return;
        }

        if use_cache {
            if let Some(payload) = self.lookup(&key, options) {
                debug!(key = %key, "serving cached payload");
                self.shared
                    .publish(generation, |state| state.succeed(payload));
                return;
            }
        }

        self.shared.publish(generation, RequestState::begin);

        let task = ResolveTask {
            key,
            spec,
            options: options.clone(),
            generation,
            signal,
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(&self.cache),
            persistence: self.persistence.clone(),
            shared: Arc::clone(&self.shared),
        };
        let handle = tokio::spawn(task.run());
        self.shared.attach(generation, handle);
    }

    /// Fresh payload from memory, or from persistence (which then hydrates
    /// the memory cache with the entry's original age).
    fn lookup(&self, key: &str, options: &FetchOptions) -> Option<T> {
        if let Some(payload) = self.cache.get_fresh(key, options.ttl) {
            return Some(payload);
        }
        let persisted = self.persistence.as_ref()?.load(key)?;
        let entry = CacheEntry::aged(key, persisted.value, persisted.age);
        if !entry.is_fresh(options.ttl) {
            return None;
        }
        let payload = entry.payload.clone();
        self.cache.insert_entry(entry);
        Some(payload)
    }

    /// Drop the cached (and persisted) entry for `key`.
    ///
    /// The current state is left untouched.
    pub fn invalidate(&self, key: &str) {
        self.cache.invalidate(key);
        if let Some(persistence) = &self.persistence {
            persistence.remove(key);
        }
    }

    /// Set `data` to `value` and cache it as freshly fetched, without a
    /// network call.
    ///
    /// Outside of `Loading`, the status also becomes `Success`. A cycle in
    /// flight is left running and may still overwrite the value.
    pub fn mutate(&self, key: &str, value: T) {
        self.cache.insert(key, value.clone());
        if let Some(persistence) = &self.persistence {
            persistence.store(key, &value);
        }
        self.shared.modify(|state| {
            if state.status == RequestStatus::Loading {
                state.data = Some(value);
            } else {
                state.succeed(value);
            }
        });
    }

    /// Abort the request or backoff wait in flight, if any.
    ///
    /// The state is left as it was: a `Loading` controller stays `Loading`
    /// until the next trigger.
    pub fn cancel(&self) {
        if self.shared.cancel() {
            debug!("cancelled in-flight request");
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState<T> {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.shared.state.subscribe()
    }

    /// Stream of state snapshots, starting with the current one.
    pub fn state_stream(&self) -> impl Stream<Item = RequestState<T>> + use<T> {
        WatchStream::new(self.subscribe())
    }

    /// Wait until the state is no longer `Loading` and return it.
    ///
    /// Never resolves for a cycle that was cancelled while loading, unless
    /// another trigger follows.
    pub async fn settled(&self) -> RequestState<T> {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Whether a cycle is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.shared.in_flight()
    }

    /// The cache this controller reads and writes.
    pub fn cache(&self) -> &Arc<ResourceCache<T>> {
        &self.cache
    }
}

impl<T> Drop for FetchController<T> {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}
