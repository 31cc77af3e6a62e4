//! Middleware for the ferry dispatch engine.
//!
//! A [`Middleware`] is a named bundle of optional hooks, one per
//! [`HookKind`]: `connect`, `call` and `call_pipelined`. Each hook is a frame
//! of a `tower` service chain and calls through to the next frame with
//! [`Next::run`]. Hooks a middleware does not implement are simply absent
//! from that chain.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `middleware-logging` | `.with_logging()` helper |
//! | `middleware-metrics` | `.with_metrics()` helper and [`MetricsMiddleware`] |
//! | `middleware-full` | All middleware |
//!
//! # Available Middleware
//!
//! - [`LoggingMiddleware`] - Logs connects, calls and pipelines using `tracing`
//! - [`MetricsMiddleware`] - Records counters and histograms with `metrics`
//!
//! # Example: Writing a Middleware
//!
//! ```ignore
//! use ferry::middleware::{Middleware, Next};
//! use ferry::{CallRequest, PipelineRequest};
//!
//! let audit = Middleware::builder("audit")
//!     .on_call(|request: CallRequest, next: Next<CallRequest>| async move {
//!         let command = request.command().clone();
//!         let result = next.run(request).await;
//!         audit_log(&command, &result);
//!         result
//!     })
//!     .build();
//!
//! // Every client built from now on is instrumented
//! ferry::register(audit);
//! ```
//!
//! # Ordering
//!
//! Global middlewares wrap the terminal I/O call, per-client middlewares wrap
//! the globals. In each list the middleware registered last is outermost:
//!
//! ```text
//! Request  → per-client → global → connection
//! Response ← per-client ← global ← connection
//! ```

mod chain;
mod hook;
mod logging;
#[cfg(feature = "middleware-metrics")]
mod metrics;
mod registry;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::Error;
use crate::operation::{CallRequest, ConnectRequest, HookKind, Operation, PipelineRequest};

pub use chain::{BoxLayer, BoxService, ServiceFuture, compile};
pub(crate) use chain::{Chains, SyncService};
pub use hook::{Hook, HookLayer, HookService, Next};
pub use logging::{LogLevel, LoggingMiddleware};
#[cfg(feature = "middleware-metrics")]
pub use metrics::MetricsMiddleware;
pub use registry::{Registry, register};

// Re-export tower types for convenience
pub use tower::ServiceBuilder;

/// A named bundle of optional hooks.
///
/// Cheap to clone: hooks are shared.
#[derive(Clone)]
pub struct Middleware {
    name: Cow<'static, str>,
    pub(crate) connect: Option<BoxLayer<ConnectRequest>>,
    pub(crate) call: Option<BoxLayer<CallRequest>>,
    pub(crate) call_pipelined: Option<BoxLayer<PipelineRequest>>,
}

impl Middleware {
    /// Start building a middleware.
    #[must_use]
    pub fn builder(name: impl Into<Cow<'static, str>>) -> MiddlewareBuilder {
        MiddlewareBuilder {
            middleware: Self {
                name: name.into(),
                connect: None,
                call: None,
                call_pipelined: None,
            },
        }
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this middleware has a hook of the given kind.
    #[must_use]
    pub const fn implements(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::Connect => self.connect.is_some(),
            HookKind::Call => self.call.is_some(),
            HookKind::CallPipelined => self.call_pipelined.is_some(),
        }
    }

    /// Hook kinds this middleware implements.
    #[must_use]
    pub fn hooks(&self) -> Vec<HookKind> {
        [HookKind::Connect, HookKind::Call, HookKind::CallPipelined]
            .into_iter()
            .filter(|kind| self.implements(*kind))
            .collect()
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("hooks", &self.hooks())
            .finish()
    }
}

/// Builder for [`Middleware`].
///
/// Setting the same hook kind twice stacks the hooks, the later one outermost.
pub struct MiddlewareBuilder {
    middleware: Middleware,
}

impl fmt::Debug for MiddlewareBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareBuilder")
            .field("middleware", &self.middleware)
            .finish()
    }
}

impl MiddlewareBuilder {
    /// Instrument connection establishment.
    #[must_use]
    pub fn on_connect(self, hook: impl Hook<ConnectRequest>) -> Self {
        self.hook(hook)
    }

    /// Instrument single command calls.
    #[must_use]
    pub fn on_call(self, hook: impl Hook<CallRequest>) -> Self {
        self.hook(hook)
    }

    /// Instrument pipelines and transactions.
    #[must_use]
    pub fn on_call_pipelined(self, hook: impl Hook<PipelineRequest>) -> Self {
        self.hook(hook)
    }

    /// Install a hook for the operation `Op`.
    #[must_use]
    pub fn hook<Op: Operation, H: Hook<Op>>(self, hook: H) -> Self {
        self.layer::<Op, _>(HookLayer::new(hook))
    }

    /// Install a raw `tower` layer for the operation `Op`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use ferry::CallRequest;
    /// use ferry::middleware::Middleware;
    /// use tower::limit::ConcurrencyLimitLayer;
    ///
    /// let limit = Middleware::builder("concurrency")
    ///     .layer::<CallRequest, _>(ConcurrencyLimitLayer::new(16))
    ///     .build();
    /// ```
    #[must_use]
    pub fn layer<Op, L>(mut self, layer: L) -> Self
    where
        Op: Operation,
        L: Layer<BoxService<Op>> + Send + Sync + 'static,
        L::Service: Service<Op, Response = Op::Output, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Op>>::Future: Send + 'static,
    {
        let layer: BoxLayer<Op> = Arc::new(move |service: BoxService<Op>| {
            BoxCloneService::new(layer.layer(service))
        });

        let slot = Op::hook_mut(&mut self.middleware);
        let composed: BoxLayer<Op> = match slot.take() {
            Some(existing) => Arc::new(move |service: BoxService<Op>| layer(existing(service))),
            None => layer,
        };
        *slot = Some(composed);
        self
    }

    /// Build the middleware.
    #[must_use]
    pub fn build(self) -> Middleware {
        self.middleware
    }
}
