//! Middleware chain compilation.
//!
//! A chain is one type-erased `tower` service per hook kind. Compilation
//! folds every middleware's layer around the terminal operation: globals
//! first, then per-client middlewares, so per-client frames end up
//! outermost. Within one list a later middleware wraps an earlier one.
//!
//! ```text
//! call ─▶ per-client (last … first) ─▶ global (last … first) ─▶ terminal I/O
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::BoxFuture;
use tower::ServiceExt;
use tower::util::BoxCloneService;

use super::Middleware;
use crate::connection::{
    CallTerminal, ConnectTerminal, ConnectionSlot, Connector, PipelineTerminal,
};
use crate::operation::{CallRequest, ConnectRequest, Operation, PipelineRequest};
use crate::{Error, Result};

/// Type-erased service for one hook kind.
pub type BoxService<Op> = BoxCloneService<Op, <Op as Operation>::Output, Error>;

/// Type-erased layer: wraps the rest of a chain into a new frame.
pub type BoxLayer<Op> = Arc<dyn Fn(BoxService<Op>) -> BoxService<Op> + Send + Sync>;

/// Future returned by every frame of a chain.
pub type ServiceFuture<T> = BoxFuture<'static, Result<T>>;

/// Compose `global` and `per_client` middlewares around `terminal`.
///
/// Middlewares without a hook for `Op` contribute no frame. Compilation
/// performs no I/O and cannot fail.
#[must_use]
pub fn compile<Op: Operation>(
    global: &[Middleware],
    per_client: &[Middleware],
    terminal: BoxService<Op>,
) -> BoxService<Op> {
    global
        .iter()
        .chain(per_client)
        .filter_map(Op::hook)
        .fold(terminal, |service, layer| layer(service))
}

/// Thread-safe wrapper for a compiled chain.
///
/// The lock is only held to clone the service, never across a call.
pub(crate) struct SyncService<Op: Operation> {
    inner: Arc<Mutex<BoxService<Op>>>,
}

impl<Op: Operation> Clone for SyncService<Op> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Op: Operation> SyncService<Op> {
    pub(crate) fn new(service: BoxService<Op>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    pub(crate) fn call(&self, request: Op) -> ServiceFuture<Op::Output> {
        let service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(service.oneshot(request))
    }
}

/// The three compiled chains of one client.
#[derive(Clone)]
pub(crate) struct Chains {
    pub(crate) connect: SyncService<ConnectRequest>,
    pub(crate) call: SyncService<CallRequest>,
    pub(crate) call_pipelined: SyncService<PipelineRequest>,
}

impl Chains {
    pub(crate) fn compile(
        global: &[Middleware],
        per_client: &[Middleware],
        connector: Arc<dyn Connector>,
        slot: &ConnectionSlot,
    ) -> Self {
        let connect = SyncService::new(compile(
            global,
            per_client,
            BoxCloneService::new(ConnectTerminal::new(connector)),
        ));
        let call = compile(
            global,
            per_client,
            BoxCloneService::new(CallTerminal::new(slot.clone(), connect.clone())),
        );
        let call_pipelined = compile(
            global,
            per_client,
            BoxCloneService::new(PipelineTerminal::new(slot.clone(), connect.clone())),
        );

        Self {
            connect,
            call: SyncService::new(call),
            call_pipelined: SyncService::new(call_pipelined),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use tower::service_fn;

    use super::*;
    use crate::middleware::Next;
    use crate::{CallMode, Command, Config, Reply};

    type Trace = Arc<StdMutex<Vec<String>>>;

    fn tracer(name: &'static str, trace: &Trace) -> Middleware {
        let trace = Arc::clone(trace);
        Middleware::builder(name)
            .on_call(move |request: CallRequest, next: Next<CallRequest>| {
                let trace = Arc::clone(&trace);
                async move {
                    trace.lock().expect("trace").push(format!("{name}:before"));
                    let result = next.run(request).await;
                    trace.lock().expect("trace").push(format!("{name}:after"));
                    result
                }
            })
            .build()
    }

    fn terminal(trace: &Trace) -> BoxService<CallRequest> {
        let trace = Arc::clone(trace);
        BoxCloneService::new(service_fn(move |request: CallRequest| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().expect("trace").push("terminal".to_owned());
                Ok::<_, Error>(Reply::from(request.command().clone()))
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

    #[tokio::test]
    async fn per_client_wraps_global_and_later_wraps_earlier() {
        let trace = Trace::default();
        let global = [tracer("g1", &trace), tracer("g2", &trace)];
        let local = [tracer("c1", &trace)];

        let chain = compile(&global, &local, terminal(&trace));
        chain.oneshot(request()).await.expect("reply");

        let trace = trace.lock().expect("trace").clone();
        assert_eq!(
            trace,
            [
                "c1:before",
                "g2:before",
                "g1:before",
                "terminal",
                "g1:after",
                "g2:after",
                "c1:after"
            ]
        );
    }

    #[tokio::test]
    async fn middlewares_without_the_hook_add_no_frame() {
        let trace = Trace::default();
        let connect_only = Middleware::builder("connect-only")
            .on_connect(|request: ConnectRequest, next: Next<ConnectRequest>| next.run(request))
            .build();

        let chain = compile(&[connect_only], &[], terminal(&trace));
        let reply = chain.oneshot(request()).await.expect("reply");

        assert_eq!(reply, Reply::from(Command::from("PING")));
        assert_eq!(*trace.lock().expect("trace"), ["terminal"]);
    }

    #[tokio::test]
    async fn empty_chain_is_the_terminal() {
        let trace = Trace::default();
        let chain = compile(&[], &[], terminal(&trace));
        chain.oneshot(request()).await.expect("reply");
        assert_eq!(trace.lock().expect("trace").len(), 1);
    }
}
