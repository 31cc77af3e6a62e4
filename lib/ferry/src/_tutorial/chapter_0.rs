//! # Chapter 0: Getting Started
//!
//! ferry does not speak any wire protocol itself. You bring a [`Connector`]
//! that opens connections, and a [`Connection`] that sends commands and reads
//! replies; ferry drives them.
//!
//! ## A Connection
//!
//! ```ignore
//! use ferry::prelude::*;
//!
//! #[derive(Debug)]
//! struct TcpConnection { /* socket, codec, ... */ }
//!
//! impl Connection for TcpConnection {
//!     fn execute<'a>(
//!         &'a mut self,
//!         command: &'a Command,
//!         config: &'a Config,
//!         _attempt: Option<u32>,
//!     ) -> BoxFuture<'a, Result<Reply>> {
//!         Box::pin(async move {
//!             self.write(command).await?;
//!             self.read_reply().await
//!         })
//!     }
//!
//!     fn execute_batch<'a>(
//!         &'a mut self,
//!         commands: &'a [Command],
//!         config: &'a Config,
//!         _attempt: Option<u32>,
//!     ) -> BoxFuture<'a, Result<Vec<Reply>>> {
//!         Box::pin(async move {
//!             self.write_all(commands).await?;
//!             self.read_replies(commands.len()).await
//!         })
//!     }
//! }
//! ```
//!
//! Report server rejections as [`Error::command`] and transport failures as
//! [`Error::connection`]; the distinction drives retries.
//!
//! ## A Client
//!
//! ```ignore
//! use ferry::Client;
//! use std::time::Duration;
//!
//! let client = Client::builder(TcpConnector)
//!     .host("db.internal")
//!     .port(6379)
//!     .timeout(Duration::from_millis(500))
//!     .build();
//!
//! let pong = client.call("PING").await?;
//! let value = client.call(Command::new("GET").arg("greeting")).await?;
//! ```
//!
//! The connection is opened on the first call. Use [`Client::connect`] to
//! open it eagerly and [`Client::close`] to drop it.
//!
//! Next: [Chapter 1: Middleware](super::chapter_1)
//!
//! [`Connector`]: crate::Connector
//! [`Connection`]: crate::Connection
//! [`Error::command`]: crate::Error::command
//! [`Error::connection`]: crate::Error::connection
//! [`Client::connect`]: crate::Client::connect
//! [`Client::close`]: crate::Client::close
