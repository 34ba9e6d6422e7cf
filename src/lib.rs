//! Huginn - fetch, cache and retry for keyed remote resources
//!
//! A [`FetchController`] resolves a resource through a shared in-memory
//! cache, an injected [`Transport`] and a bounded exponential-backoff retry
//! loop, and publishes its progress as a [`RequestState`]. Fresh cache hits
//! never touch the network; transport failures are retried; anything in
//! flight can be cancelled without ever surfacing as an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use huginn::{FetchController, FetchOptions, HttpTransport, RequestSpec, RequestStatus};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let options = FetchOptions::new()
//!         .ttl(Duration::from_secs(5))
//!         .max_retries(2)
//!         .base_backoff(Duration::from_millis(100));
//!
//!     let controller = FetchController::<serde_json::Value>::builder()
//!         .transport(Arc::new(HttpTransport::<serde_json::Value>::new()?))
//!         .bind(
//!             "equip-list",
//!             RequestSpec::new("https://example.com/api/equipment").param("page", "1"),
//!             options,
//!         )
//!         .build()?;
//!
//!     let state = controller.settled().await;
//!     if state.status == RequestStatus::Success {
//!         println!("{:?}", state.data);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Sharing a cache
//!
//! Controllers built over the same `Arc<ResourceCache<T>>` serve each
//! other's results:
//!
//! ```rust
//! use std::sync::Arc;
//! use huginn::{FetchController, FnTransport, HuginnError, ResourceCache};
//!
//! let cache = Arc::new(ResourceCache::<u32>::new());
//! let transport = Arc::new(FnTransport::new(
//!     |_spec: huginn::RequestSpec, _signal: huginn::AbortSignal| async {
//!         Ok::<u32, HuginnError>(42)
//!     },
//! ));
//!
//! let first = FetchController::<u32>::builder()
//!     .transport(transport.clone())
//!     .cache(cache.clone())
//!     .build()
//!     .unwrap();
//! let second = FetchController::<u32>::builder()
//!     .transport(transport)
//!     .cache(cache)
//!     .build()
//!     .unwrap();
//! assert!(Arc::ptr_eq(first.cache(), second.cache()));
//! ```

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod retry;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheEntry, FileStore, KeyValueStore, MemoryStore, PersistedCache, ResourceCache};
pub use config::Config;
pub use controller::{FetchController, FetchControllerBuilder};
pub use error::{HuginnError, Result};
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{AbortSignal, Abortable, FnTransport, Transport};
pub use types::{FetchOptions, Outcome, RequestSpec, RequestState, RequestStatus};
pub use version::{PKG_VERSION, version_string};

#[cfg(feature = "http")]
pub use transport::HttpTransport;
