//! The resolve loop spawned by `trigger`/`refetch`.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::Shared;
use crate::cache::ResourceCache;
use crate::cache::persisted::PayloadPersistence;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::telemetry;
use crate::transport::{AbortSignal, Abortable, Transport};
use crate::types::{FetchOptions, Outcome, RequestSpec};

/// One trigger cycle: attempt, back off, retry, until success, terminal
/// failure, or abort.
pub(super) struct ResolveTask<T> {
    pub(super) key: String,
    pub(super) spec: RequestSpec,
    pub(super) options: FetchOptions,
    pub(super) generation: u64,
    pub(super) signal: AbortSignal,
    pub(super) transport: Arc<dyn Transport<T>>,
    pub(super) cache: Arc<ResourceCache<T>>,
    pub(super) persistence: Option<Arc<dyn PayloadPersistence<T>>>,
    pub(super) shared: Arc<Shared<T>>,
}

impl<T> ResolveTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(super) async fn run(self) {
        let mut policy = RetryPolicy::new(&self.options);

        loop {
            let started = Instant::now();
            let outcome =
                Abortable::new(self.transport.request(&self.spec, &self.signal), &self.signal)
                    .await;
            metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());

            let err = match outcome {
                Outcome::Success(payload) => {
                    metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "ok").increment(1);
                    self.complete(payload);
                    return;
                }
                Outcome::Cancelled => {
                    metrics::counter!(telemetry::ABORTS_TOTAL).increment(1);
                    debug!(key = %self.key, "request aborted");
                    return;
                }
                Outcome::Failure(err) => {
                    metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "error").increment(1);
                    err
                }
            };

            if !err.is_transport() {
                warn!(key = %self.key, error = %err, "request failed with non-retryable error");
                self.shared.publish(self.generation, |state| state.fail(err));
                return;
            }

            match policy.next() {
                RetryDecision::Retry { attempt, delay } => {
                    warn!(
                        key = %self.key,
                        attempt,
                        max_retries = self.options.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transport error"
                    );
                    metrics::counter!(telemetry::RETRIES_TOTAL).increment(1);
                    if !self
                        .shared
                        .publish(self.generation, |state| state.retrying(attempt))
                    {
                        return;
                    }
                    tokio::select! {
                        biased;
                        _ = self.signal.aborted() => {
                            metrics::counter!(telemetry::ABORTS_TOTAL).increment(1);
                            debug!(key = %self.key, attempt, "backoff aborted");
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::GiveUp => {
                    warn!(
                        key = %self.key,
                        retries = policy.attempt(),
                        error = %err,
                        "giving up after exhausting retries"
                    );
                    self.shared.publish(self.generation, |state| state.fail(err));
                    return;
                }
            }
        }
    }

    /// Store the payload and publish `Success`, unless this cycle has been
    /// superseded or cancelled in the meantime.
    fn complete(&self, payload: T) {
        let cache = &self.cache;
        let key = &self.key;
        let accepted = self.shared.publish(self.generation, |state| {
            cache.insert(key.clone(), payload.clone());
            state.succeed(payload.clone());
        });
        if !accepted {
            debug!(key = %self.key, "discarding response of superseded request");
            return;
        }
        debug!(key = %self.key, "resolved");
        if let Some(persistence) = &self.persistence {
            persistence.store(&self.key, &payload);
        }
    }
}
