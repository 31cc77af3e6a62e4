//! Client façade.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::batch::{Batch, BatchKind};
use crate::config::{Config, ConfigBuilder, ReconnectPolicy};
use crate::connection::{ConnectionSlot, Connector};
use crate::dispatch::Dispatcher;
use crate::middleware::{Chains, Middleware, Registry};
use crate::operation::CallMode;
use crate::{Command, Reply, Result};

// Feature-gated imports for middleware
#[cfg(feature = "middleware-logging")]
use crate::middleware::LoggingMiddleware;
#[cfg(feature = "middleware-metrics")]
use crate::middleware::MetricsMiddleware;

// ============================================================================
// Public Client
// ============================================================================

/// Client dispatching commands through its middleware chains.
///
/// Owns at most one live connection, opened lazily on the first call.
/// Clones share that connection and the compiled chains.
///
/// # Example
///
/// ```ignore
/// use ferry::Client;
///
/// let client = Client::builder(connector)
///     .reconnect_attempts(1)
///     .build();
///
/// let reply = client.call(["GET", "greeting"]).await?;
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<Config>,
    chains: Chains,
    slot: ConnectionSlot,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client against the global registry.
    #[must_use]
    pub fn new(connector: impl Connector, config: Config) -> Self {
        Self::with_registry(Arc::new(connector), config, Registry::global())
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder(connector: impl Connector) -> ClientBuilder {
        ClientBuilder {
            connector: Arc::new(connector),
            config: ConfigBuilder::default(),
        }
    }

    fn with_registry(connector: Arc<dyn Connector>, config: Config, registry: &Registry) -> Self {
        let slot = ConnectionSlot::default();
        let chains = Chains::compile(&registry.snapshot(), &config.middlewares, connector, &slot);
        debug!(
            server = %config.server(),
            global = registry.len(),
            local = config.middlewares.len(),
            "client built"
        );

        Self {
            config: Arc::new(config),
            chains,
            slot,
        }
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.chains, &self.slot, &self.config)
    }

    /// Open the connection now instead of on the first call.
    ///
    /// Does nothing if already connected.
    ///
    /// # Errors
    ///
    /// Returns the error of the `connect` chain.
    pub async fn connect(&self) -> Result<()> {
        self.dispatcher().ensure_connected().await
    }

    /// Drop the current connection. The next call reconnects.
    pub async fn close(&self) {
        self.slot.close().await;
    }

    /// Returns `true` if the client currently holds a connection.
    pub async fn is_connected(&self) -> bool {
        self.slot.is_connected().await
    }

    /// Send a command, reconnecting and retrying on connection errors.
    ///
    /// # Errors
    ///
    /// Returns the command error, or the last connection error once the
    /// reconnect policy is exhausted.
    pub async fn call(&self, command: impl Into<Command>) -> Result<Reply> {
        self.dispatcher()
            .call(command.into(), CallMode::Retrying)
            .await
    }

    /// Send a command exactly once, for commands that are unsafe to repeat.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub async fn call_once(&self, command: impl Into<Command>) -> Result<Reply> {
        self.dispatcher().call(command.into(), CallMode::NoRetry).await
    }

    /// Send a command whose reply may take up to `timeout` (forever with `None`).
    ///
    /// # Errors
    ///
    /// Same as [`Client::call`].
    pub async fn blocking_call(
        &self,
        timeout: Option<Duration>,
        command: impl Into<Command>,
    ) -> Result<Reply> {
        self.dispatcher()
            .call(command.into(), CallMode::Blocking { timeout })
            .await
    }

    /// Send every command queued by `build` in a single round trip.
    ///
    /// Returns one reply per queued command. If `build` fails, nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns the error of `build`, or of the pipeline as a whole.
    pub async fn pipelined<F>(&self, build: F) -> Result<Vec<Reply>>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        self.batch(BatchKind::Pipeline, build).await
    }

    /// Send every command queued by `build` as a `MULTI` / `EXEC` transaction.
    ///
    /// Returns the raw replies: `OK`, one acknowledgement per command, then
    /// the `EXEC` reply.
    ///
    /// # Errors
    ///
    /// Same as [`Client::pipelined`].
    pub async fn multi<F>(&self, build: F) -> Result<Vec<Reply>>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        self.batch(BatchKind::Transaction, build).await
    }

    async fn batch<F>(&self, kind: BatchKind, build: F) -> Result<Vec<Reply>>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        let mut batch = Batch::new(kind);
        if let Err(err) = build(&mut batch) {
            debug!(%kind, queued = batch.len(), error = %err, "batch discarded");
            return Err(err);
        }
        batch.flush(&self.dispatcher()).await
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Client`].
///
/// # Example
///
/// ```ignore
/// use ferry::Client;
/// use std::time::Duration;
///
/// let client = Client::builder(connector)
///     .host("db.internal")
///     .timeout(Duration::from_millis(500))
///     .reconnect_attempts(2)
///     .with_logging()
///     .build();
/// ```
pub struct ClientBuilder {
    connector: Arc<dyn Connector>,
    config: ConfigBuilder,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config = self.config.host(host);
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config = self.config.port(port);
        self
    }

    /// Set the database index.
    #[must_use]
    pub fn db(mut self, db: u32) -> Self {
        self.config = self.config.db(db);
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config = self.config.credentials(username, password);
        self
    }

    /// Set the client name.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config = self.config.id(id);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.read_timeout(timeout);
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.write_timeout(timeout);
        self
    }

    /// Set connect, read and write timeouts at once.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Reconnect and retry up to `count` times on connection errors.
    #[must_use]
    pub fn reconnect_attempts(mut self, count: u32) -> Self {
        self.config = self.config.reconnect_attempts(count);
        self
    }

    /// Set the reconnect policy.
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.config = self.config.reconnect(policy);
        self
    }

    // ========================================================================
    // Middleware
    // ========================================================================

    /// Add a middleware scoped to this client.
    ///
    /// Client middlewares wrap the global ones; the last added is outermost.
    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.config = self.config.middleware(middleware);
        self
    }

    /// Add command logging.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = Client::builder(connector)
    ///     .with_logging()
    ///     .build();
    /// ```
    #[cfg(feature = "middleware-logging")]
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.middleware(LoggingMiddleware::new().into_middleware())
    }

    /// Add debug-level logging (includes full command arguments).
    #[cfg(feature = "middleware-logging")]
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.middleware(LoggingMiddleware::debug().into_middleware())
    }

    /// Add metrics collection.
    ///
    /// Records command counts, durations, in-flight commands, pipelines and
    /// connects using the `metrics` crate facade.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = Client::builder(connector)
    ///     .with_metrics()
    ///     .build();
    /// ```
    #[cfg(feature = "middleware-metrics")]
    #[must_use]
    pub fn with_metrics(self) -> Self {
        self.middleware(MetricsMiddleware::new().into_middleware())
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client against the global registry.
    #[must_use]
    pub fn build(self) -> Client {
        self.build_with(Registry::global())
    }

    /// Build the client against `registry` instead of the global one.
    #[must_use]
    pub fn build_with(self, registry: &Registry) -> Client {
        Client::with_registry(self.connector, self.config.build(), registry)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::future::BoxFuture;

    use super::*;
    use crate::{BoxConnection, Error};

    struct Unreachable;

    impl Connector for Unreachable {
        fn connect<'a>(&'a self, config: &'a Config) -> BoxFuture<'a, Result<BoxConnection>> {
            let server = config.server();
            Box::pin(async move { Err(Error::connection(format!("{server} unreachable"))) })
        }
    }

    #[test]
    fn builder_resolves_config() {
        let client = Client::builder(Unreachable)
            .host("db.internal")
            .db(2)
            .reconnect_attempts(3)
            .middleware(Middleware::builder("local").build())
            .build_with(&Registry::new());

        assert_eq!(client.config().server(), "db.internal:6379");
        assert_eq!(client.config().db, 2);
        assert_eq!(client.config().reconnect.max_attempts(), 3);
        assert_eq!(client.config().middlewares.len(), 1);
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let client = Client::builder(Unreachable).build_with(&Registry::new());

        let error = client.call("PING").await.expect_err("unreachable");

        assert_eq!(error, Error::connection("localhost:6379 unreachable"));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn failing_scope_sends_nothing() {
        let client = Client::builder(Unreachable).build_with(&Registry::new());

        let error = client
            .pipelined(|batch| {
                batch.call("PING");
                Err(Error::other("changed my mind"))
            })
            .await
            .expect_err("discarded");

        assert_eq!(error, Error::other("changed my mind"));
    }

    #[tokio::test]
    async fn empty_batch_skips_io() {
        let client = Client::builder(Unreachable).build_with(&Registry::new());

        let replies = client.multi(|_| Ok(())).await.expect("no I/O");

        assert!(replies.is_empty());
    }
}
