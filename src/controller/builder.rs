//! Builder for configuring controller instances

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::FetchController;
use crate::cache::persisted::PayloadPersistence;
use crate::cache::{PersistedCache, ResourceCache};
use crate::transport::Transport;
use crate::types::{FetchOptions, RequestSpec};
use crate::{HuginnError, Result};

/// Resource a controller resolves as soon as it is built.
struct Binding {
    key: String,
    spec: RequestSpec,
    options: FetchOptions,
}

/// Builder for [`FetchController`].
///
/// Only the transport is required. Without [`cache()`](Self::cache) the
/// controller gets a private cache; pass a shared `Arc` to let several
/// controllers reuse each other's results.
pub struct FetchControllerBuilder<T> {
    transport: Option<Arc<dyn Transport<T>>>,
    cache: Option<Arc<ResourceCache<T>>>,
    persistence: Option<Arc<dyn PayloadPersistence<T>>>,
    initial_data: Option<T>,
    binding: Option<Binding>,
}

impl<T> FetchControllerBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            transport: None,
            cache: None,
            persistence: None,
            initial_data: None,
            binding: None,
        }
    }

    /// Transport used for every network attempt.
    pub fn transport(mut self, transport: Arc<dyn Transport<T>>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing cache instead of allocating a private one.
    pub fn cache(mut self, cache: Arc<ResourceCache<T>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Value exposed as `data` before anything has been resolved.
    pub fn initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Resource to resolve on build when `options.auto_start` is set.
    pub fn bind(
        mut self,
        key: impl Into<String>,
        spec: RequestSpec,
        options: FetchOptions,
    ) -> Self {
        self.binding = Some(Binding {
            key: key.into(),
            spec,
            options,
        });
        self
    }

    /// Build the controller, triggering the bound resource if `auto_start`
    /// is set.
    ///
    /// # Panics
    ///
    /// Auto-start spawns onto the tokio runtime, so building with an
    /// auto-starting binding must happen within a runtime context.
    pub fn build(self) -> Result<FetchController<T>> {
        let transport = self
            .transport
            .ok_or_else(|| HuginnError::Configuration("no transport configured".to_string()))?;
        if let Some(binding) = &self.binding {
            binding.options.validate()?;
        }

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ResourceCache::new()));
        let controller =
            FetchController::from_parts(transport, cache, self.persistence, self.initial_data);

        if let Some(binding) = self.binding {
            if binding.options.auto_start {
                controller.trigger(binding.key, binding.spec, &binding.options);
            }
        }
        Ok(controller)
    }
}

impl<T> FetchControllerBuilder<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Persist resolved payloads so they survive restarts.
    pub fn persistence(mut self, persistence: PersistedCache) -> Self {
        self.persistence = Some(Arc::new(persistence));
        self
    }
}

impl<T> Default for FetchControllerBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
