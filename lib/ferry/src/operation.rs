//! Operations flowing through the middleware chains.
//!
//! Each hook kind has its own request type:
//! - [`ConnectRequest`] - obtain a fresh connection ([`HookKind::Connect`])
//! - [`CallRequest`] - send a single command ([`HookKind::Call`])
//! - [`PipelineRequest`] - send a batch in one round trip ([`HookKind::CallPipelined`])
//!
//! All three carry the client's shared [`Config`]; calls and pipelines also
//! carry the attempt counter (`None` when the call runs without retries).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::batch::BatchKind;
use crate::connection::BoxConnection;
use crate::middleware::{BoxLayer, Middleware};
use crate::{Command, Config, Reply};

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::ConnectRequest {}
    impl Sealed for super::CallRequest {}
    impl Sealed for super::PipelineRequest {}
}

/// The hook kinds a middleware may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Connection establishment.
    Connect,
    /// Single command dispatch.
    Call,
    /// Pipeline or transaction dispatch.
    CallPipelined,
}

impl HookKind {
    /// Hook name as used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Call => "call",
            Self::CallPipelined => "call_pipelined",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request type that flows through one middleware chain.
///
/// Implemented by [`ConnectRequest`], [`CallRequest`] and [`PipelineRequest`] only.
pub trait Operation: sealed::Sealed + Send + Sized + 'static {
    /// Successful result of the operation.
    type Output: Send + 'static;

    /// The hook kind this operation is dispatched through.
    const KIND: HookKind;

    #[doc(hidden)]
    fn hook(middleware: &Middleware) -> Option<&BoxLayer<Self>>;

    #[doc(hidden)]
    fn hook_mut(middleware: &mut Middleware) -> &mut Option<BoxLayer<Self>>;
}

// ============================================================================
// Call Mode
// ============================================================================

/// How a single command is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallMode {
    /// Reconnect and retry on connection errors, up to the configured limit.
    #[default]
    Retrying,
    /// Exactly one attempt, reported with no attempt counter.
    NoRetry,
    /// Like [`CallMode::Retrying`], but the reply may take arbitrarily long.
    ///
    /// With `timeout: None` the client waits indefinitely; otherwise the read
    /// deadline is extended by `timeout`.
    Blocking {
        /// Server-side timeout of the blocking command.
        timeout: Option<Duration>,
    },
}

impl CallMode {
    /// Attempt counter of the first attempt.
    #[must_use]
    pub const fn initial_attempt(self) -> Option<u32> {
        match self {
            Self::NoRetry => None,
            Self::Retrying | Self::Blocking { .. } => Some(0),
        }
    }

    /// Client-side deadline for one attempt, given the configured read timeout.
    #[must_use]
    pub fn deadline(self, read_timeout: Duration) -> Option<Duration> {
        match self {
            Self::Retrying | Self::NoRetry => Some(read_timeout),
            Self::Blocking { timeout: None } => None,
            Self::Blocking {
                timeout: Some(timeout),
            } => Some(read_timeout.saturating_add(timeout)),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Request to establish a connection.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    config: Arc<Config>,
}

impl ConnectRequest {
    pub(crate) const fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Configuration of the client connecting.
    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }
}

impl Operation for ConnectRequest {
    type Output = BoxConnection;

    const KIND: HookKind = HookKind::Connect;

    fn hook(middleware: &Middleware) -> Option<&BoxLayer<Self>> {
        middleware.connect.as_ref()
    }

    fn hook_mut(middleware: &mut Middleware) -> &mut Option<BoxLayer<Self>> {
        &mut middleware.connect
    }
}

/// Request to send one command.
#[derive(Debug, Clone)]
pub struct CallRequest {
    command: Command,
    config: Arc<Config>,
    attempt: Option<u32>,
    mode: CallMode,
}

impl CallRequest {
    pub(crate) const fn new(
        command: Command,
        config: Arc<Config>,
        attempt: Option<u32>,
        mode: CallMode,
    ) -> Self {
        Self {
            command,
            config,
            attempt,
            mode,
        }
    }

    /// The command being sent.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// Configuration of the calling client.
    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Zero-based attempt number, `None` for calls without retries.
    #[must_use]
    pub const fn attempt(&self) -> Option<u32> {
        self.attempt
    }

    /// Dispatch mode of the logical call.
    #[must_use]
    pub const fn mode(&self) -> CallMode {
        self.mode
    }

    /// Returns `true` if the reply may take arbitrarily long.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self.mode, CallMode::Blocking { .. })
    }
}

impl Operation for CallRequest {
    type Output = Reply;

    const KIND: HookKind = HookKind::Call;

    fn hook(middleware: &Middleware) -> Option<&BoxLayer<Self>> {
        middleware.call.as_ref()
    }

    fn hook_mut(middleware: &mut Middleware) -> &mut Option<BoxLayer<Self>> {
        &mut middleware.call
    }
}

/// Request to send a batch of commands in one round trip.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    commands: Arc<[Command]>,
    config: Arc<Config>,
    attempt: Option<u32>,
    kind: BatchKind,
}

impl PipelineRequest {
    pub(crate) const fn new(
        commands: Arc<[Command]>,
        config: Arc<Config>,
        attempt: Option<u32>,
        kind: BatchKind,
    ) -> Self {
        Self {
            commands,
            config,
            attempt,
            kind,
        }
    }

    /// Every command of the batch, transaction markers included.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Configuration of the calling client.
    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Zero-based attempt number.
    #[must_use]
    pub const fn attempt(&self) -> Option<u32> {
        self.attempt
    }

    /// Whether this batch is a plain pipeline or a transaction.
    #[must_use]
    pub const fn kind(&self) -> BatchKind {
        self.kind
    }
}

impl Operation for PipelineRequest {
    type Output = Vec<Reply>;

    const KIND: HookKind = HookKind::CallPipelined;

    fn hook(middleware: &Middleware) -> Option<&BoxLayer<Self>> {
        middleware.call_pipelined.as_ref()
    }

    fn hook_mut(middleware: &mut Middleware) -> &mut Option<BoxLayer<Self>> {
        &mut middleware.call_pipelined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_attempt_per_mode() {
        assert_eq!(CallMode::Retrying.initial_attempt(), Some(0));
        assert_eq!(CallMode::NoRetry.initial_attempt(), None);
        assert_eq!(
            CallMode::Blocking { timeout: None }.initial_attempt(),
            Some(0)
        );
    }

    #[test]
    fn blocking_deadline_extends_read_timeout() {
        let read = Duration::from_secs(1);
        assert_eq!(CallMode::Retrying.deadline(read), Some(read));
        assert_eq!(CallMode::Blocking { timeout: None }.deadline(read), None);
        assert_eq!(
            CallMode::Blocking {
                timeout: Some(Duration::from_secs(5))
            }
            .deadline(read),
            Some(Duration::from_secs(6))
        );
    }

    #[test]
    fn hook_kind_names() {
        assert_eq!(HookKind::Connect.to_string(), "connect");
        assert_eq!(HookKind::CallPipelined.to_string(), "call_pipelined");
    }
}
