//! Core types for the ferry command dispatch engine.
//!
//! This crate provides the value types shared by every layer of ferry:
//! - [`Command`] - Ordered, binary-safe command tokens
//! - [`Reply`] - Opaque successful server reply
//! - [`Error`], [`ErrorKind`] and [`Result`] - Error taxonomy used for retry decisions

mod command;
mod error;
pub mod prelude;
mod reply;

pub use command::{Command, IntoArg};
pub use error::{Error, ErrorKind, Result};
pub use reply::Reply;

// Re-export bytes for binary arguments and bulk replies
pub use bytes::Bytes;
