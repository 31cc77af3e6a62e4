//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob
//! importing:
//!
//! ```ignore
//! use ferry::prelude::*;
//! ```

pub use crate::middleware::{Hook, Middleware, Next};
pub use crate::{
    Batch, BoxConnection, BoxFuture, CallRequest, Client, Command, Config, ConnectRequest,
    Connection, Connector, Error, ErrorKind, PipelineRequest, ReconnectPolicy, Reply, ReplyHandle,
    Result,
};
