//! Error types for ferry.
//!
//! The dispatch engine only reasons about two fatal categories, exposed as
//! [`ErrorKind`]: connection failures (retryable) and command rejections
//! (never retried). Everything else is [`ErrorKind::Other`] and propagates
//! like a command rejection.

use derive_more::{Display, Error};

// ============================================================================
// Error Kind
// ============================================================================

/// Classification used by the retry controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// The transport is unusable; the call may be retried after a reconnect.
    #[display("connection")]
    Connection,
    /// The server understood the request but rejected the command.
    #[display("command")]
    Command,
    /// Anything else. Propagated unchanged, never retried.
    #[display("other")]
    Other,
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for ferry operations.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum Error {
    /// Network/connection errors, including failed (re)connects.
    #[display("connection error: {_0}")]
    Connection(#[error(not(source))] String),

    /// A deadline elapsed while waiting on the connection.
    #[display("timeout")]
    Timeout,

    /// The connection produced replies that do not line up with the commands sent.
    #[display("protocol error: {_0}")]
    Protocol(#[error(not(source))] String),

    /// The server rejected the command.
    #[display("{message}")]
    Command {
        /// Error payload as sent by the server (e.g. `ERR unknown command`).
        message: String,
    },

    /// The command cannot be dispatched at all (e.g. it has no tokens).
    #[display("invalid command: {_0}")]
    InvalidCommand(#[error(not(source))] String),

    /// Unclassified error, usually raised by a middleware.
    #[display("{_0}")]
    Other(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a command error from the server's error payload.
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Create an invalid command error.
    #[must_use]
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand(message.into())
    }

    /// Create an unclassified error.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// How the retry controller treats this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) | Self::Timeout | Self::Protocol(_) => ErrorKind::Connection,
            Self::Command { .. } => ErrorKind::Command,
            Self::InvalidCommand(_) | Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Returns `true` if this is a connection-kind error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection)
    }

    /// Returns `true` if the server rejected the command.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Command { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if a reconnect-and-retry may fix this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_connection()
    }

    /// Leading error code of a command error (`ERR`, `WRONGTYPE`, ...).
    ///
    /// Returns `None` for other variants or when the payload does not start
    /// with an upper-case word.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        let Self::Command { message } = self else {
            return None;
        };
        message
            .split_whitespace()
            .next()
            .filter(|word| word.chars().all(|c| c.is_ascii_uppercase()))
    }
}
