//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types
//! for easy glob importing:
//!
//! ```ignore
//! use ferry_core::prelude::*;
//! ```

pub use crate::{Command, Error, ErrorKind, IntoArg, Reply, Result};
