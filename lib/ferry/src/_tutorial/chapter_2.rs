//! # Chapter 2: Retries & Batches
//!
//! ## Reconnecting
//!
//! By default a connection error is returned to the caller. Allow reconnects
//! to retry the call on a fresh connection:
//!
//! ```ignore
//! use ferry::{Client, ReconnectPolicy};
//! use std::time::Duration;
//!
//! // Up to two retries, immediately
//! let client = Client::builder(connector).reconnect_attempts(2).build();
//!
//! // Up to three retries, backing off
//! let client = Client::builder(connector)
//!     .reconnect(ReconnectPolicy::with_delays([
//!         Duration::ZERO,
//!         Duration::from_millis(100),
//!         Duration::from_secs(1),
//!     ]))
//!     .build();
//! ```
//!
//! Middlewares see every attempt: the attempt number is `0` for the first
//! try and grows by one per retry. Command errors are never retried.
//!
//! | Method | Attempts | Deadline |
//! |--------|----------|----------|
//! | `call` | `0..=limit` | read timeout |
//! | `call_once` | one, reported as `None` | read timeout |
//! | `blocking_call(Some(t), ..)` | `0..=limit` | read timeout + `t` |
//! | `blocking_call(None, ..)` | `0..=limit` | none |
//!
//! ## Pipelines
//!
//! ```ignore
//! let replies = client
//!     .pipelined(|batch| {
//!         batch.call(["SET", "a", "1"]);
//!         batch.call(["GET", "a"]);
//!         Ok(())
//!     })
//!     .await?;
//! ```
//!
//! The batch is sent in one round trip and retried as a whole. Returning an
//! error from the closure discards it without sending anything.
//!
//! ## Transactions
//!
//! ```ignore
//! let replies = client
//!     .multi(|tx| {
//!         tx.call(["INCR", "counter"]);
//!         Ok(())
//!     })
//!     .await?;
//! // replies == ["OK", "QUEUED", [1]]
//! ```
//!
//! The `call_pipelined` hook sees the full sequence, `MULTI` and `EXEC`
//! included.
