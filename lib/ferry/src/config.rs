//! Client configuration types.

use std::fmt;
use std::time::Duration;

use crate::middleware::Middleware;

/// How many times, and after which pauses, a failed call reconnects and retries.
///
/// The number of configured delays is the attempt limit: a policy with two
/// delays allows attempts `0`, `1` and `2`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconnectPolicy {
    delays: Vec<Duration>,
}

impl ReconnectPolicy {
    /// Never reconnect.
    #[must_use]
    pub const fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// Reconnect up to `count` times, without pausing.
    #[must_use]
    pub fn attempts(count: u32) -> Self {
        Self {
            delays: (0..count).map(|_| Duration::ZERO).collect(),
        }
    }

    /// Reconnect once per delay, sleeping for that delay first.
    #[must_use]
    pub fn with_delays(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
        }
    }

    /// Maximum number of reconnects for one logical call.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        u32::try_from(self.delays.len()).unwrap_or(u32::MAX)
    }

    /// Returns `true` if the call that just failed on `attempt` may be retried.
    #[must_use]
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    /// Pause before reconnecting after a failure on `attempt`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        usize::try_from(attempt)
            .ok()
            .and_then(|index| self.delays.get(index))
            .copied()
    }
}

/// Configuration for a client.
///
/// Shared as `Arc<Config>` with every middleware hook, so middlewares can key
/// per-client state on it.
#[derive(Clone)]
pub struct Config {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Logical database index selected after connecting.
    pub db: u32,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Client name announced to the server.
    pub id: Option<String>,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// Deadline for a reply once a command has been sent.
    pub read_timeout: Duration,
    /// Deadline for writing a command to the socket.
    ///
    /// Enforced by the [`Connection`](crate::Connection) implementation, which
    /// receives this config with every command.
    pub write_timeout: Duration,
    /// Retry policy on connection errors.
    pub reconnect: ReconnectPolicy,
    /// Middlewares scoped to this client, wrapping the global ones.
    pub middlewares: Vec<Middleware>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 6379,
            db: 0,
            username: None,
            password: None,
            id: None,
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            reconnect: ReconnectPolicy::none(),
            middlewares: Vec::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("id", &self.id)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("reconnect", &self.reconnect)
            .field("middlewares", &self.middlewares)
            .finish()
    }
}

impl Config {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` of the server.
    #[must_use]
    pub fn server(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    db: Option<u32>,
    username: Option<String>,
    password: Option<String>,
    id: Option<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    reconnect: Option<ReconnectPolicy>,
    middlewares: Vec<Middleware>,
}

impl ConfigBuilder {
    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the server port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database index.
    #[must_use]
    pub const fn db(mut self, db: u32) -> Self {
        self.db = Some(db);
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the client name.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub const fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Set connect, read and write timeouts at once.
    #[must_use]
    pub const fn timeout(self, timeout: Duration) -> Self {
        self.connect_timeout(timeout)
            .read_timeout(timeout)
            .write_timeout(timeout)
    }

    /// Reconnect and retry up to `count` times on connection errors.
    #[must_use]
    pub fn reconnect_attempts(self, count: u32) -> Self {
        self.reconnect(ReconnectPolicy::attempts(count))
    }

    /// Set the reconnect policy.
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = Some(policy);
        self
    }

    /// Add a middleware scoped to this client.
    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        let defaults = Config::default();
        Config {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            db: self.db.unwrap_or(defaults.db),
            username: self.username,
            password: self.password,
            id: self.id,
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            write_timeout: self.write_timeout.unwrap_or(defaults.write_timeout),
            reconnect: self.reconnect.unwrap_or(defaults.reconnect),
            middlewares: self.middlewares,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server(), "localhost:6379");
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert_eq!(config.reconnect.max_attempts(), 0);
        assert!(config.middlewares.is_empty());
    }

    #[test]
    fn builder_overrides() {
        let config = Config::builder()
            .host("db.internal")
            .port(6380)
            .db(3)
            .timeout(Duration::from_millis(250))
            .reconnect_attempts(2)
            .build();

        assert_eq!(config.server(), "db.internal:6380");
        assert_eq!(config.db, 3);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.write_timeout, Duration::from_millis(250));
        assert_eq!(config.reconnect.max_attempts(), 2);
    }

    #[test]
    fn reconnect_policy_limits() {
        let policy = ReconnectPolicy::with_delays([Duration::ZERO, Duration::from_millis(50)]);
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
        assert_eq!(policy.delay(1), Some(Duration::from_millis(50)));
        assert_eq!(policy.delay(2), None);

        assert!(!ReconnectPolicy::none().allows_retry(0));
    }

    #[test]
    fn debug_redacts_password() {
        let config = Config::builder().credentials("app", "hunter2").build();
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }
}
