//! Middleware-instrumented command dispatch for database clients.
//!
//! ferry sits between a client façade and a wire connection. Every connect,
//! command and pipeline runs through a chain of user middlewares; connection
//! failures are retried after a reconnect; batches are sent in one round trip.
//!
//! # Example
//!
//! ```ignore
//! use ferry::prelude::*;
//!
//! ferry::register(
//!     Middleware::builder("audit")
//!         .on_call(|request: CallRequest, next: Next<CallRequest>| async move {
//!             tracing::info!(command = %request.command(), attempt = ?request.attempt());
//!             next.run(request).await
//!         })
//!         .build(),
//! );
//!
//! let client = Client::builder(connector).reconnect_attempts(1).build();
//! let pong = client.call("PING").await?;
//!
//! let replies = client
//!     .multi(|tx| {
//!         tx.call(["INCR", "counter"]);
//!         Ok(())
//!     })
//!     .await?;
//! ```
//!
//! See the [tutorial][_tutorial] for a complete guide.

pub mod _tutorial;
mod batch;
mod client;
mod config;
mod connection;
mod dispatch;
pub mod middleware;
mod operation;
pub mod prelude;

// Re-export client types
pub use batch::{Batch, BatchKind, ReplyHandle};
pub use client::{Client, ClientBuilder};
pub use config::{Config, ConfigBuilder, ReconnectPolicy};

// Re-export the connection boundary
pub use connection::{BoxConnection, Connection, Connector};

// Re-export operation types
pub use operation::{CallMode, CallRequest, ConnectRequest, HookKind, Operation, PipelineRequest};

// Re-export middleware essentials
pub use middleware::{Middleware, register};

// Re-export core types
pub use ferry_core::{Bytes, Command, Error, ErrorKind, IntoArg, Reply, Result};

// Re-export futures and tower for connection and middleware implementations
pub use futures_util::future::BoxFuture;
pub use tower;
