//! Metrics middleware using the metrics crate facade.
//!
//! This middleware records command, pipeline and connect metrics using the
//! `metrics` crate, which allows integration with various metrics backends
//! (Prometheus, `StatsD`, etc.).

use std::time::Instant;

use super::{Hook, Middleware, Next, ServiceFuture};
use crate::operation::{CallRequest, ConnectRequest, PipelineRequest};
use crate::{BoxConnection, Reply, Result};

/// Labels used for metrics.
const LABEL_COMMAND: &str = "command";
const LABEL_STATUS: &str = "status";

/// Metric names.
const METRIC_COMMANDS_TOTAL: &str = "ferry_commands_total";
const METRIC_COMMAND_DURATION: &str = "ferry_command_duration_seconds";
const METRIC_COMMANDS_IN_FLIGHT: &str = "ferry_commands_in_flight";
const METRIC_PIPELINES_TOTAL: &str = "ferry_pipelines_total";
const METRIC_CONNECTS_TOTAL: &str = "ferry_connects_total";

/// Middleware that records dispatch metrics.
///
/// Records the following metrics:
/// - `ferry_commands_total` (counter): Commands sent, labeled by command and status
/// - `ferry_command_duration_seconds` (histogram): Command duration in seconds
/// - `ferry_commands_in_flight` (gauge): Commands currently awaiting a reply
/// - `ferry_pipelines_total` (counter): Pipelines and transactions, labeled by status
/// - `ferry_connects_total` (counter): Connection attempts, labeled by status
///
/// Every attempt is recorded, so a retried command counts once per attempt.
///
/// # Example
///
/// ```ignore
/// use ferry::middleware::MetricsMiddleware;
///
/// ferry::register(MetricsMiddleware::new().into_middleware());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsMiddleware {
    _private: (),
}

impl MetricsMiddleware {
    /// Create a new metrics middleware.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Bundle into a [`Middleware`] hooking all three operations.
    #[must_use]
    pub fn into_middleware(self) -> Middleware {
        Middleware::builder("metrics")
            .on_connect(self)
            .on_call(self)
            .on_call_pipelined(self)
            .build()
    }
}

/// `ok`, or the error kind (`connection`, `command`, `other`).
fn status<T>(result: &Result<T>) -> String {
    match result {
        Ok(_) => "ok".to_owned(),
        Err(err) => err.kind().to_string(),
    }
}

impl Hook<ConnectRequest> for MetricsMiddleware {
    fn intercept(
        &self,
        request: ConnectRequest,
        next: Next<ConnectRequest>,
    ) -> ServiceFuture<BoxConnection> {
        Box::pin(async move {
            let result = next.run(request).await;
            metrics::counter!(METRIC_CONNECTS_TOTAL, LABEL_STATUS => status(&result)).increment(1);
            result
        })
    }
}

impl Hook<CallRequest> for MetricsMiddleware {
    fn intercept(&self, request: CallRequest, next: Next<CallRequest>) -> ServiceFuture<Reply> {
        let command = request
            .command()
            .name()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let start = Instant::now();

        metrics::gauge!(METRIC_COMMANDS_IN_FLIGHT).increment(1.0);

        Box::pin(async move {
            let result = next.run(request).await;

            metrics::gauge!(METRIC_COMMANDS_IN_FLIGHT).decrement(1.0);

            let duration = start.elapsed().as_secs_f64();
            metrics::histogram!(METRIC_COMMAND_DURATION, LABEL_COMMAND => command.clone())
                .record(duration);

            metrics::counter!(
                METRIC_COMMANDS_TOTAL,
                LABEL_COMMAND => command,
                LABEL_STATUS => status(&result)
            )
            .increment(1);

            result
        })
    }
}

impl Hook<PipelineRequest> for MetricsMiddleware {
    fn intercept(
        &self,
        request: PipelineRequest,
        next: Next<PipelineRequest>,
    ) -> ServiceFuture<Vec<Reply>> {
        Box::pin(async move {
            let result = next.run(request).await;
            metrics::counter!(METRIC_PIPELINES_TOTAL, LABEL_STATUS => status(&result)).increment(1);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tower::util::BoxCloneService;
    use tower::{ServiceExt, service_fn};

    use super::*;
    use crate::middleware::{BoxService, compile};
    use crate::{CallMode, Command, Config, Error};

    fn counting_terminal(calls: &Arc<AtomicU32>, fail: bool) -> BoxService<CallRequest> {
        let calls = Arc::clone(calls);
        BoxCloneService::new(service_fn(move |_request: CallRequest| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if fail {
                    Err(Error::connection("mock error"))
                } else {
                    Ok(Reply::from("PONG"))
                }
            }
        }))
    }

    fn request() -> CallRequest {
        CallRequest::new(
            Command::from("PING"),
            Arc::new(Config::default()),
            Some(0),
            CallMode::Retrying,
        )
    }

    #[test]
    fn status_labels() {
        assert_eq!(status(&Ok(())), "ok");
        assert_eq!(status::<()>(&Err(Error::connection("down"))), "connection");
        assert_eq!(status::<()>(&Err(Error::command("ERR nope"))), "command");
        assert_eq!(status::<()>(&Err(Error::other("boom"))), "other");
    }

    #[tokio::test]
    async fn metrics_pass_replies_through() {
        let calls = Arc::new(AtomicU32::new(0));
        let middleware = MetricsMiddleware::new().into_middleware();
        let chain = compile(&[middleware], &[], counting_terminal(&calls, false));

        let reply = chain.oneshot(request()).await.expect("reply");

        assert_eq!(reply, Reply::from("PONG"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn metrics_pass_errors_through() {
        let calls = Arc::new(AtomicU32::new(0));
        let middleware = MetricsMiddleware::new().into_middleware();
        let chain = compile(&[middleware], &[], counting_terminal(&calls, true));

        let error = chain.oneshot(request()).await.expect_err("error");

        assert!(error.is_connection());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
