//! The call-through contract between a middleware and the rest of its chain.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, ServiceExt};
use tower_service::Service;

use super::{BoxService, ServiceFuture};
use crate::operation::Operation;
use crate::{Error, Result};

/// One middleware frame for the operation `Op`.
///
/// A hook receives the request and a [`Next`] continuation. On its normal
/// path it calls `next.run(request)` and may inspect or replace the result;
/// a hook that returns without calling through must produce the value or
/// error itself.
///
/// Closures `Fn(Op, Next<Op>) -> impl Future<Output = Result<Op::Output>>`
/// implement `Hook` directly.
///
/// # Example
///
/// ```ignore
/// use ferry::middleware::{Hook, Next, ServiceFuture};
/// use ferry::{CallRequest, Error, Reply};
///
/// struct FailFirstAttempt;
///
/// impl Hook<CallRequest> for FailFirstAttempt {
///     fn intercept(&self, request: CallRequest, next: Next<CallRequest>) -> ServiceFuture<Reply> {
///         Box::pin(async move {
///             if request.attempt() == Some(0) {
///                 return Err(Error::connection("injected"));
///             }
///             next.run(request).await
///         })
///     }
/// }
/// ```
pub trait Hook<Op: Operation>: Send + Sync + 'static {
    /// Handle `request`, usually by calling through to `next`.
    fn intercept(&self, request: Op, next: Next<Op>) -> ServiceFuture<Op::Output>;
}

impl<Op, F, Fut> Hook<Op> for F
where
    Op: Operation,
    F: Fn(Op, Next<Op>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Op::Output>> + Send + 'static,
{
    fn intercept(&self, request: Op, next: Next<Op>) -> ServiceFuture<Op::Output> {
        Box::pin(self(request, next))
    }
}

/// The remainder of the chain below a middleware frame.
pub struct Next<Op: Operation> {
    inner: BoxService<Op>,
}

impl<Op: Operation> Next<Op> {
    pub(crate) const fn new(inner: BoxService<Op>) -> Self {
        Self { inner }
    }

    /// Call through to the next frame (ultimately the raw I/O operation).
    pub async fn run(self, request: Op) -> Result<Op::Output> {
        self.inner.oneshot(request).await
    }
}

impl<Op: Operation> fmt::Debug for Next<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("kind", &Op::KIND)
            .finish_non_exhaustive()
    }
}

/// Layer adapting a [`Hook`] into a `tower` service frame.
pub struct HookLayer<H, Op> {
    hook: Arc<H>,
    _op: PhantomData<fn(Op)>,
}

impl<H, Op> HookLayer<H, Op> {
    /// Wrap `hook` into a layer.
    pub fn new(hook: H) -> Self {
        Self {
            hook: Arc::new(hook),
            _op: PhantomData,
        }
    }
}

impl<H, Op> Clone for HookLayer<H, Op> {
    fn clone(&self) -> Self {
        Self {
            hook: Arc::clone(&self.hook),
            _op: PhantomData,
        }
    }
}

impl<H, Op> fmt::Debug for HookLayer<H, Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookLayer").finish_non_exhaustive()
    }
}

impl<H: Hook<Op>, Op: Operation> Layer<BoxService<Op>> for HookLayer<H, Op> {
    type Service = HookService<H, Op>;

    fn layer(&self, inner: BoxService<Op>) -> Self::Service {
        HookService {
            hook: Arc::clone(&self.hook),
            inner,
        }
    }
}

/// Service running a [`Hook`] around the rest of the chain.
pub struct HookService<H, Op: Operation> {
    hook: Arc<H>,
    inner: BoxService<Op>,
}

impl<H, Op: Operation> Clone for HookService<H, Op> {
    fn clone(&self) -> Self {
        Self {
            hook: Arc::clone(&self.hook),
            inner: self.inner.clone(),
        }
    }
}

impl<H, Op: Operation> fmt::Debug for HookService<H, Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookService")
            .field("kind", &Op::KIND)
            .finish_non_exhaustive()
    }
}

impl<H: Hook<Op>, Op: Operation> Service<Op> for HookService<H, Op> {
    type Response = Op::Output;
    type Error = Error;
    type Future = ServiceFuture<Op::Output>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // Readiness of the inner frames is driven by `Next::run`.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Op) -> Self::Future {
        self.hook.intercept(request, Next::new(self.inner.clone()))
    }
}
