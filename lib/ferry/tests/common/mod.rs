//! Shared fixtures: an in-memory server and a recording middleware.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ferry::middleware::{Hook, Middleware, Next, ServiceFuture};
use ferry::{
    BoxConnection, BoxFuture, Bytes, CallRequest, Command, Config, ConnectRequest, Connection,
    Connector, Error, PipelineRequest, Reply, Result,
};

// ============================================================================
// Fake Server
// ============================================================================

/// How long a stalled request takes to answer.
pub const STALL: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct ServerState {
    connects: AtomicU32,
    refuse_connects: AtomicU32,
    drop_requests: AtomicU32,
    stall_requests: AtomicU32,
    received: Mutex<Vec<Command>>,
    store: Mutex<HashMap<Bytes, Bytes>>,
}

impl ServerState {
    fn take_one(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory server understanding a handful of commands.
///
/// `PING`, `ECHO`, `SET`, `GET`, `INCR`, `MULTI` and `EXEC`; anything else is
/// rejected with `ERR unknown command`.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<ServerState>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector opening connections to this server.
    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            state: Arc::clone(&self.state),
        }
    }

    /// Number of successful connects.
    pub fn connects(&self) -> u32 {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Every command that reached the server, in order.
    pub fn received(&self) -> Vec<Command> {
        self.state.received.lock().expect("received").clone()
    }

    /// Refuse the next `count` connects.
    pub fn refuse_connects(&self, count: u32) {
        self.state.refuse_connects.store(count, Ordering::SeqCst);
    }

    /// Reset the connection on the next `count` requests (command or batch).
    pub fn drop_requests(&self, count: u32) {
        self.state.drop_requests.store(count, Ordering::SeqCst);
    }

    /// Delay the replies of the next `count` requests by [`STALL`].
    pub fn stall_requests(&self, count: u32) {
        self.state.stall_requests.store(count, Ordering::SeqCst);
    }
}

pub struct FakeConnector {
    state: Arc<ServerState>,
}

impl Connector for FakeConnector {
    fn connect<'a>(&'a self, _config: &'a Config) -> BoxFuture<'a, Result<BoxConnection>> {
        Box::pin(async move {
            if ServerState::take_one(&self.state.refuse_connects) {
                return Err(Error::connection("connection refused"));
            }
            self.state.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeConnection {
                state: Arc::clone(&self.state),
                queued: None,
            }) as BoxConnection)
        })
    }
}

#[derive(Debug)]
struct FakeConnection {
    state: Arc<ServerState>,
    queued: Option<Vec<Command>>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState").finish_non_exhaustive()
    }
}

impl FakeConnection {
    async fn wait_or_drop(&self) -> Result<()> {
        if ServerState::take_one(&self.state.drop_requests) {
            return Err(Error::connection("connection reset by peer"));
        }
        if ServerState::take_one(&self.state.stall_requests) {
            tokio::time::sleep(STALL).await;
        }
        Ok(())
    }

    fn handle(&mut self, command: &Command) -> Result<Reply> {
        self.state
            .received
            .lock()
            .expect("received")
            .push(command.clone());

        let name = command.name().unwrap_or_default().to_ascii_uppercase();
        match (name.as_str(), self.queued.as_mut()) {
            ("MULTI", None) => {
                self.queued = Some(Vec::new());
                Ok(Reply::from("OK"))
            }
            ("EXEC", Some(_)) => {
                let queued = self.queued.take().unwrap_or_default();
                queued
                    .iter()
                    .map(|command| self.apply(command))
                    .collect::<Result<Vec<_>>>()
                    .map(Reply::from)
            }
            (_, Some(queue)) => {
                queue.push(command.clone());
                Ok(Reply::from("QUEUED"))
            }
            (_, None) => self.apply(command),
        }
    }

    fn apply(&self, command: &Command) -> Result<Reply> {
        let name = command.name().unwrap_or_default().to_ascii_uppercase();
        let mut store = self.state.store.lock().expect("store");
        match (name.as_str(), command.args()) {
            ("PING", [_]) => Ok(Reply::from("PONG")),
            ("ECHO", [_, message]) => Ok(Reply::from(message.clone())),
            ("SET", [_, key, value]) => {
                store.insert(key.clone(), value.clone());
                Ok(Reply::from("OK"))
            }
            ("GET", [_, key]) => Ok(Reply::from(store.get(key).cloned())),
            ("INCR", [_, key]) => {
                let current = store
                    .get(key)
                    .and_then(|value| std::str::from_utf8(value).ok()?.parse::<i64>().ok())
                    .unwrap_or(0);
                let next = current + 1;
                store.insert(key.clone(), Bytes::from(next.to_string()));
                Ok(Reply::from(next))
            }
            _ => Err(Error::command(format!("ERR unknown command '{name}'"))),
        }
    }
}

impl Connection for FakeConnection {
    fn execute<'a>(
        &'a mut self,
        command: &'a Command,
        _config: &'a Config,
        _attempt: Option<u32>,
    ) -> BoxFuture<'a, Result<Reply>> {
        Box::pin(async move {
            self.wait_or_drop().await?;
            self.handle(command)
        })
    }

    fn execute_batch<'a>(
        &'a mut self,
        commands: &'a [Command],
        _config: &'a Config,
        _attempt: Option<u32>,
    ) -> BoxFuture<'a, Result<Vec<Reply>>> {
        Box::pin(async move {
            self.wait_or_drop().await?;
            commands.iter().map(|command| self.handle(command)).collect()
        })
    }
}

// ============================================================================
// Recording Middleware
// ============================================================================

/// One completed hook invocation, as seen by [`Recorder`].
#[derive(Debug, Clone)]
pub enum Event {
    Connect {
        result: Result<()>,
        config: Arc<Config>,
    },
    Call {
        command: Command,
        result: Result<Reply>,
        config: Arc<Config>,
        attempt: Option<u32>,
    },
    Pipeline {
        commands: Vec<Command>,
        result: Result<Vec<Reply>>,
        config: Arc<Config>,
        attempt: Option<u32>,
    },
}

impl Event {
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    pub fn is_error(&self) -> bool {
        match self {
            Self::Connect { result, .. } => result.is_err(),
            Self::Call { result, .. } => result.is_err(),
            Self::Pipeline { result, .. } => result.is_err(),
        }
    }
}

/// Middleware logging every hook outcome, after the rest of the chain ran.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn middleware(&self) -> Middleware {
        Middleware::builder("recorder")
            .on_connect(self.clone())
            .on_call(self.clone())
            .on_call_pipelined(self.clone())
            .build()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("events").clone()
    }

    /// Events other than connects.
    pub fn calls(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| !event.is_connect())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().expect("events").clear();
    }

    fn push(&self, event: Event) {
        self.events.lock().expect("events").push(event);
    }
}

impl Hook<ConnectRequest> for Recorder {
    fn intercept(
        &self,
        request: ConnectRequest,
        next: Next<ConnectRequest>,
    ) -> ServiceFuture<BoxConnection> {
        let recorder = self.clone();
        Box::pin(async move {
            let config = Arc::clone(request.config());
            let result = next.run(request).await;
            recorder.push(Event::Connect {
                result: result.as_ref().map(|_| ()).map_err(Clone::clone),
                config,
            });
            result
        })
    }
}

impl Hook<CallRequest> for Recorder {
    fn intercept(&self, request: CallRequest, next: Next<CallRequest>) -> ServiceFuture<Reply> {
        let recorder = self.clone();
        Box::pin(async move {
            let command = request.command().clone();
            let config = Arc::clone(request.config());
            let attempt = request.attempt();
            let result = next.run(request).await;
            recorder.push(Event::Call {
                command,
                result: result.clone(),
                config,
                attempt,
            });
            result
        })
    }
}

impl Hook<PipelineRequest> for Recorder {
    fn intercept(
        &self,
        request: PipelineRequest,
        next: Next<PipelineRequest>,
    ) -> ServiceFuture<Vec<Reply>> {
        let recorder = self.clone();
        Box::pin(async move {
            let commands = request.commands().to_vec();
            let config = Arc::clone(request.config());
            let attempt = request.attempt();
            let result = next.run(request).await;
            recorder.push(Event::Pipeline {
                commands,
                result: result.clone(),
                config,
                attempt,
            });
            result
        })
    }
}

// ============================================================================
// Other Middlewares
// ============================================================================

/// Fails the first attempt of every call and pipeline with a connection error.
pub fn fail_first_attempt() -> Middleware {
    Middleware::builder("fail-first-attempt")
        .on_call(|request: CallRequest, next: Next<CallRequest>| async move {
            if request.attempt() == Some(0) {
                return Err(Error::connection("injected"));
            }
            next.run(request).await
        })
        .on_call_pipelined(
            |request: PipelineRequest, next: Next<PipelineRequest>| async move {
                if request.attempt() == Some(0) {
                    return Err(Error::connection("injected"));
                }
                next.run(request).await
            },
        )
        .build()
}

/// Answers without calling through: commands are echoed back as replies.
pub fn echo_commands() -> Middleware {
    Middleware::builder("echo-commands")
        .on_call(|request: CallRequest, _next: Next<CallRequest>| async move {
            Ok::<_, Error>(Reply::from(request.command().clone()))
        })
        .on_call_pipelined(
            |request: PipelineRequest, _next: Next<PipelineRequest>| async move {
                Ok::<_, Error>(request.commands().iter().cloned().map(Reply::from).collect())
            },
        )
        .build()
}
