//! Command logging middleware.
//!
//! This middleware logs connects, calls and pipelines using the `tracing` crate.

use std::time::Instant;

use tracing::{Instrument, Level, debug, info, span, warn};

use super::{Hook, Middleware, Next, ServiceFuture};
use crate::operation::{CallRequest, ConnectRequest, PipelineRequest};
use crate::{BoxConnection, Reply};

/// Middleware that logs every hook it is installed on.
///
/// # Example
///
/// ```ignore
/// use ferry::middleware::LoggingMiddleware;
///
/// ferry::register(LoggingMiddleware::new().into_middleware());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware {
    level: LogLevel,
}

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    /// Log at debug level (full command arguments).
    Debug,
    /// Log at info level (command name only).
    #[default]
    Info,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging middleware that logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Bundle this logger into a [`Middleware`] hooking all three operations.
    #[must_use]
    pub fn into_middleware(self) -> Middleware {
        Middleware::builder("logging")
            .on_connect(self)
            .on_call(self)
            .on_call_pipelined(self)
            .build()
    }
}

// Saturating conversion to u64 (truncates after ~584 million years)
fn millis_since(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl Hook<ConnectRequest> for LoggingMiddleware {
    fn intercept(
        &self,
        request: ConnectRequest,
        next: Next<ConnectRequest>,
    ) -> ServiceFuture<BoxConnection> {
        let server = request.config().server();
        let span = span!(Level::INFO, "ferry_connect", %server);

        Box::pin(
            async move {
                let start = Instant::now();
                debug!(server = %server, "connecting");

                let result = next.run(request).await;
                let elapsed_ms = millis_since(start);

                match &result {
                    Ok(_) => info!(elapsed_ms, "connected"),
                    Err(err) => warn!(error = %err, elapsed_ms, "connect failed"),
                }

                result
            }
            .instrument(span),
        )
    }
}

impl Hook<CallRequest> for LoggingMiddleware {
    fn intercept(&self, request: CallRequest, next: Next<CallRequest>) -> ServiceFuture<Reply> {
        let command = request.command().name().unwrap_or_default().to_owned();
        let attempt = request.attempt();
        let level = self.level;

        let span = span!(Level::INFO, "ferry_call", %command, ?attempt);

        Box::pin(
            async move {
                let start = Instant::now();

                match level {
                    LogLevel::Debug => {
                        debug!(command = %request.command(), ?attempt, "sending command");
                    }
                    LogLevel::Info => {
                        info!(command = %command, ?attempt, "sending command");
                    }
                }

                let result = next.run(request).await;
                let elapsed_ms = millis_since(start);

                match &result {
                    Ok(_) => info!(elapsed_ms, "command completed"),
                    Err(err) if err.is_command() => {
                        warn!(error = %err, elapsed_ms, "command rejected");
                    }
                    Err(err) => {
                        warn!(error = %err, kind = %err.kind(), elapsed_ms, "command failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

impl Hook<PipelineRequest> for LoggingMiddleware {
    fn intercept(
        &self,
        request: PipelineRequest,
        next: Next<PipelineRequest>,
    ) -> ServiceFuture<Vec<Reply>> {
        let kind = request.kind();
        let commands = request.commands().len();
        let attempt = request.attempt();
        let level = self.level;

        let span = span!(Level::INFO, "ferry_pipeline", %kind, commands, ?attempt);

        Box::pin(
            async move {
                let start = Instant::now();

                match level {
                    LogLevel::Debug => {
                        let names: Vec<_> = request
                            .commands()
                            .iter()
                            .map(ToString::to_string)
                            .collect();
                        debug!(commands = ?names, ?attempt, "sending pipeline");
                    }
                    LogLevel::Info => {
                        info!(commands, ?attempt, "sending pipeline");
                    }
                }

                let result = next.run(request).await;
                let elapsed_ms = millis_since(start);

                match &result {
                    Ok(replies) => info!(replies = replies.len(), elapsed_ms, "pipeline completed"),
                    Err(err) => warn!(error = %err, elapsed_ms, "pipeline failed"),
                }

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::HookKind;

    #[test]
    fn logging_middleware_default() {
        let logging = LoggingMiddleware::new();
        assert!(matches!(logging.level, LogLevel::Info));
    }

    #[test]
    fn logging_middleware_debug() {
        let logging = LoggingMiddleware::debug();
        assert!(matches!(logging.level, LogLevel::Debug));
    }

    #[test]
    fn logging_hooks_every_operation() {
        let middleware = LoggingMiddleware::new().into_middleware();
        assert_eq!(middleware.name(), "logging");
        assert_eq!(
            middleware.hooks(),
            [HookKind::Connect, HookKind::Call, HookKind::CallPipelined]
        );
    }
}
