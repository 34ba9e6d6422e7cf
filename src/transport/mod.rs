//! Transport contract and cancellation plumbing.
//!
//! A [`Transport`] turns a [`RequestSpec`] into a payload. The controller
//! hands every call an [`AbortSignal`]; transports may watch it to stop
//! early, but they don't have to: the controller wraps each call in
//! [`Abortable`], which drops the transport future as soon as the signal
//! fires and reports [`Outcome::Cancelled`].

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use pin_project_lite::pin_project;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::types::{Outcome, RequestSpec};
use crate::Result;

/// Asynchronous request function injected into a controller.
///
/// Contract: resolve to the payload, fail with a transport error
/// ([`HuginnError::Http`](crate::HuginnError::Http) or
/// [`HuginnError::Status`](crate::HuginnError::Status)) on network faults
/// and non-success responses, and return
/// [`HuginnError::Aborted`](crate::HuginnError::Aborted) promptly once
/// `signal` fires.
#[async_trait]
pub trait Transport<T>: Send + Sync {
    async fn request(&self, spec: &RequestSpec, signal: &AbortSignal) -> Result<T>;
}

/// Cancellation signal shared between a controller and one in-flight cycle.
///
/// Cheap to clone; all clones observe the same abort.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal fires.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }
}

pin_project! {
    /// Future adapter that races `inner` against an [`AbortSignal`].
    ///
    /// The signal is checked before the inner future on every poll, so an
    /// abort always wins over a response that becomes ready at the same time.
    pub struct Abortable<F> {
        #[pin]
        inner: F,
        #[pin]
        aborted: WaitForCancellationFutureOwned,
    }
}

impl<F> Abortable<F> {
    pub fn new(inner: F, signal: &AbortSignal) -> Self {
        Self {
            inner,
            aborted: signal.token.clone().cancelled_owned(),
        }
    }
}

impl<F, T> Future for Abortable<F>
where
    F: Future<Output = Result<T>>,
{
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if this.aborted.poll(cx).is_ready() {
            return Poll::Ready(Outcome::Cancelled);
        }
        this.inner.poll(cx).map(Outcome::from)
    }
}

/// [`Transport`] backed by a plain async closure.
///
/// ```rust
/// # use huginn::{AbortSignal, FnTransport, HuginnError, RequestSpec};
/// let transport = FnTransport::new(|spec: RequestSpec, _signal: AbortSignal| async move {
///     if spec.target.is_empty() {
///         return Err(HuginnError::Http("no target".into()));
///     }
///     Ok(spec.target.len())
/// });
/// # let _ = transport;
/// ```
pub struct FnTransport<F> {
    f: F,
}

impl<F> FnTransport<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> Transport<T> for FnTransport<F>
where
    F: Fn(RequestSpec, AbortSignal) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    async fn request(&self, spec: &RequestSpec, signal: &AbortSignal) -> Result<T> {
        (self.f)(spec.clone(), signal.clone()).await
    }
}
