//! # Chapter 1: Middleware
//!
//! A middleware is a named bundle of up to three hooks:
//!
//! | Hook | Request | Output |
//! |------|---------|--------|
//! | `connect` | [`ConnectRequest`] | `BoxConnection` |
//! | `call` | [`CallRequest`] | `Reply` |
//! | `call_pipelined` | [`PipelineRequest`] | `Vec<Reply>` |
//!
//! Each hook receives the request and a [`Next`] continuation. Call
//! `next.run(request)` to continue down the chain.
//!
//! ## Timing Calls
//!
//! ```ignore
//! use ferry::middleware::{Middleware, Next};
//! use ferry::CallRequest;
//! use std::time::Instant;
//!
//! let timing = Middleware::builder("timing")
//!     .on_call(|request: CallRequest, next: Next<CallRequest>| async move {
//!         let start = Instant::now();
//!         let name = request.command().name().unwrap_or_default().to_owned();
//!         let result = next.run(request).await;
//!         tracing::info!(%name, elapsed = ?start.elapsed());
//!         result
//!     })
//!     .build();
//!
//! // For every client built from now on
//! ferry::register(timing.clone());
//!
//! // Or for one client only
//! let client = Client::builder(connector).middleware(timing).build();
//! ```
//!
//! ## Ordering
//!
//! Client middlewares wrap global middlewares, which wrap the connection.
//! Within each list, the middleware added last is outermost.
//!
//! ## Short-Circuiting
//!
//! A hook that returns without calling `next` replaces the I/O entirely:
//!
//! ```ignore
//! let stub = Middleware::builder("stub")
//!     .on_call(|request: CallRequest, _next: Next<CallRequest>| async move {
//!         Ok(Reply::from(request.command().clone()))
//!     })
//!     .build();
//! ```
//!
//! ## Stateful Hooks
//!
//! Implement [`Hook`] on your own type to keep state across calls:
//!
//! ```ignore
//! use ferry::middleware::{Hook, Next, ServiceFuture};
//!
//! struct Counter(Arc<AtomicU64>);
//!
//! impl Hook<CallRequest> for Counter {
//!     fn intercept(&self, request: CallRequest, next: Next<CallRequest>) -> ServiceFuture<Reply> {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!         Box::pin(next.run(request))
//!     }
//! }
//! ```
//!
//! ## Built-in Middleware
//!
//! - `with_logging()` / `with_debug_logging()` (feature `middleware-logging`)
//! - `with_metrics()` (feature `middleware-metrics`)
//!
//! Next: [Chapter 2: Retries & Batches](super::chapter_2)
//!
//! [`ConnectRequest`]: crate::ConnectRequest
//! [`CallRequest`]: crate::CallRequest
//! [`PipelineRequest`]: crate::PipelineRequest
//! [`Next`]: crate::middleware::Next
//! [`Hook`]: crate::middleware::Hook
