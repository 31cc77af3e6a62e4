//! Connection boundary and terminal operations.
//!
//! The wire layer implements [`Connector`] and [`Connection`]; ferry never
//! encodes or decodes bytes itself. The terminal services defined here are
//! the innermost frame of every middleware chain: they own the raw I/O call
//! and apply the configured deadlines.
//!
//! Only `connect_timeout` and `read_timeout` are enforced here. A
//! [`Connection`] receives the client's [`Config`] on every call and applies
//! `write_timeout` itself, around the write half of its exchange.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, MutexGuard};
use tower_service::Service;
use tracing::debug;

use crate::middleware::{ServiceFuture, SyncService};
use crate::operation::{CallRequest, ConnectRequest, PipelineRequest};
use crate::{Command, Config, Error, Reply, Result};

/// A live connection to the server.
///
/// Implementations own the write deadline ([`Config::write_timeout`]); the
/// read deadline is applied around the whole exchange by the caller.
///
/// Implementations report server-side rejections as [`Error::Command`] and
/// transport failures as connection-kind errors ([`Error::Connection`],
/// [`Error::Timeout`], [`Error::Protocol`]).
///
/// # Example
///
/// ```ignore
/// use ferry::{BoxFuture, Command, Config, Connection, Reply, Result};
///
/// #[derive(Debug)]
/// struct Loopback;
///
/// impl Connection for Loopback {
///     fn execute<'a>(
///         &'a mut self,
///         command: &'a Command,
///         _config: &'a Config,
///         _attempt: Option<u32>,
///     ) -> BoxFuture<'a, Result<Reply>> {
///         Box::pin(async move { Ok(Reply::from(command.clone())) })
///     }
///
///     fn execute_batch<'a>(
///         &'a mut self,
///         commands: &'a [Command],
///         _config: &'a Config,
///         _attempt: Option<u32>,
///     ) -> BoxFuture<'a, Result<Vec<Reply>>> {
///         Box::pin(async move { Ok(commands.iter().cloned().map(Reply::from).collect()) })
///     }
/// }
/// ```
pub trait Connection: Send + fmt::Debug {
    /// Send one command and read its reply.
    fn execute<'a>(
        &'a mut self,
        command: &'a Command,
        config: &'a Config,
        attempt: Option<u32>,
    ) -> BoxFuture<'a, Result<Reply>>;

    /// Send every command in one write, then read one reply per command.
    ///
    /// Either all commands are transmitted or none are.
    fn execute_batch<'a>(
        &'a mut self,
        commands: &'a [Command],
        config: &'a Config,
        attempt: Option<u32>,
    ) -> BoxFuture<'a, Result<Vec<Reply>>>;
}

/// Type-erased connection, as produced by the `connect` chain.
pub type BoxConnection = Box<dyn Connection>;

/// Opens connections for a client.
pub trait Connector: Send + Sync + 'static {
    /// Establish a new connection to the server described by `config`.
    fn connect<'a>(&'a self, config: &'a Config) -> BoxFuture<'a, Result<BoxConnection>>;
}

// ============================================================================
// Connection Slot
// ============================================================================

/// The connection currently owned by a client, if any.
#[derive(Clone, Default)]
pub(crate) struct ConnectionSlot {
    inner: Arc<Mutex<Option<BoxConnection>>>,
}

impl ConnectionSlot {
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<BoxConnection>> {
        self.inner.lock().await
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.lock().await.is_some()
    }

    pub(crate) async fn close(&self) {
        if self.lock().await.take().is_some() {
            debug!("connection closed");
        }
    }
}

impl fmt::Debug for ConnectionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSlot").finish_non_exhaustive()
    }
}

async fn with_deadline<T>(
    deadline: Option<Duration>,
    pending: BoxFuture<'_, Result<T>>,
) -> Result<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, pending)
            .await
            .unwrap_or_else(|_| Err(Error::Timeout)),
        None => pending.await,
    }
}

// ============================================================================
// Terminal Services
// ============================================================================

/// Innermost frame of the `connect` chain.
#[derive(Clone)]
pub(crate) struct ConnectTerminal {
    connector: Arc<dyn Connector>,
}

impl ConnectTerminal {
    pub(crate) fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

impl Service<ConnectRequest> for ConnectTerminal {
    type Response = BoxConnection;
    type Error = Error;
    type Future = ServiceFuture<BoxConnection>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ConnectRequest) -> Self::Future {
        let connector = Arc::clone(&self.connector);
        Box::pin(async move {
            let config = request.config();
            with_deadline(Some(config.connect_timeout), connector.connect(config)).await
        })
    }
}

/// Take the slot's connection, or open a new one through the `connect` chain.
///
/// The slot stays empty until the caller puts the connection back, so a
/// connection whose exchange never completes is dropped rather than reused.
async fn checkout(
    slot: &mut Option<BoxConnection>,
    connect: &SyncService<ConnectRequest>,
    config: &Arc<Config>,
) -> Result<BoxConnection> {
    match slot.take() {
        Some(connection) => Ok(connection),
        None => {
            debug!(server = %config.server(), "reopening connection");
            connect.call(ConnectRequest::new(Arc::clone(config))).await
        }
    }
}

/// Innermost frame of the `call` chain.
#[derive(Clone)]
pub(crate) struct CallTerminal {
    slot: ConnectionSlot,
    connect: SyncService<ConnectRequest>,
}

impl CallTerminal {
    pub(crate) const fn new(slot: ConnectionSlot, connect: SyncService<ConnectRequest>) -> Self {
        Self { slot, connect }
    }
}

impl Service<CallRequest> for CallTerminal {
    type Response = Reply;
    type Error = Error;
    type Future = ServiceFuture<Reply>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: CallRequest) -> Self::Future {
        let slot = self.slot.clone();
        let connect = self.connect.clone();
        Box::pin(async move {
            let mut guard = slot.lock().await;
            let mut connection = checkout(&mut guard, &connect, request.config()).await?;

            let deadline = request.mode().deadline(request.config().read_timeout);
            let pending =
                connection.execute(request.command(), request.config(), request.attempt());
            let result = with_deadline(deadline, pending).await;

            // The stream may hold a partial reply; never reuse it.
            if !result.as_ref().is_err_and(Error::is_connection) {
                *guard = Some(connection);
            }
            result
        })
    }
}

/// Innermost frame of the `call_pipelined` chain.
#[derive(Clone)]
pub(crate) struct PipelineTerminal {
    slot: ConnectionSlot,
    connect: SyncService<ConnectRequest>,
}

impl PipelineTerminal {
    pub(crate) const fn new(slot: ConnectionSlot, connect: SyncService<ConnectRequest>) -> Self {
        Self { slot, connect }
    }
}

impl Service<PipelineRequest> for PipelineTerminal {
    type Response = Vec<Reply>;
    type Error = Error;
    type Future = ServiceFuture<Vec<Reply>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: PipelineRequest) -> Self::Future {
        let slot = self.slot.clone();
        let connect = self.connect.clone();
        Box::pin(async move {
            let mut guard = slot.lock().await;
            let mut connection = checkout(&mut guard, &connect, request.config()).await?;

            let expected = request.commands().len();
            let pending =
                connection.execute_batch(request.commands(), request.config(), request.attempt());
            let result = with_deadline(Some(request.config().read_timeout), pending)
                .await
                .and_then(|replies| check_alignment(expected, replies));

            if !result.as_ref().is_err_and(Error::is_connection) {
                *guard = Some(connection);
            }
            result
        })
    }
}

/// Fail unless there is exactly one reply per command.
fn check_alignment(expected: usize, replies: Vec<Reply>) -> Result<Vec<Reply>> {
    if replies.len() == expected {
        Ok(replies)
    } else {
        Err(Error::protocol(format!(
            "expected {expected} replies, got {}",
            replies.len()
        )))
    }
}
