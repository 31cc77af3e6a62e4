//! # Tutorial: Instrumenting a database client with ferry
//!
//! Learn to wire a connection into ferry, observe it with middlewares, and
//! make it resilient, step by step.
//!
//! ## Chapters
//!
//! 1. [Getting Started][chapter_0] - Connectors, clients and calls
//! 2. [Middleware][chapter_1] - Hooks, ordering and short-circuits
//! 3. [Retries & Batches][chapter_2] - Reconnects, pipelines, transactions
//!
//! Ready? Start with [Chapter 0: Getting Started][chapter_0].

pub mod chapter_0;
pub mod chapter_1;
pub mod chapter_2;
