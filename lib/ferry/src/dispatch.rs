//! Retry controller.
//!
//! Drives one logical call through its middleware chain. Every attempt is a
//! full pass through the chain; connection-kind failures trigger a reconnect
//! (through the `connect` chain) and another attempt, up to the client's
//! [`ReconnectPolicy`](crate::ReconnectPolicy).
//!
//! The connection is shared by every clone of a client. A terminal that finds
//! it gone (dropped by a sibling call) reopens it through the `connect` chain
//! itself, so the controller only connects up front and after its own
//! failures.
//!
//! ```text
//!            ┌──────── success / command error ────────▶ done
//! Attempting(n) ── connection error, n < limit ──▶ Reconnecting(n)
//!      ▲                                               │
//!      └──────────── Attempting(n + 1) ◀── connected ──┘
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::batch::BatchKind;
use crate::connection::{BoxConnection, ConnectionSlot};
use crate::middleware::{Chains, SyncService};
use crate::operation::{CallMode, CallRequest, ConnectRequest, Operation, PipelineRequest};
use crate::{Command, Config, Error, Reply, Result};

/// Where one logical call currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Invoke the chain with this attempt counter.
    Attempting(Option<u32>),
    /// Attempt `n` failed on the connection; replace it.
    Reconnecting(u32),
}

/// Classified result of one pass through a chain.
enum Outcome<T> {
    Succeeded(T),
    Retryable(Error),
    Fatal(Error),
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Succeeded(value),
            Err(err) if err.is_retryable() => Self::Retryable(err),
            Err(err) => Self::Fatal(err),
        }
    }
}

/// Borrowed view over a client, running logical calls.
pub(crate) struct Dispatcher<'a> {
    chains: &'a Chains,
    slot: &'a ConnectionSlot,
    config: &'a Arc<Config>,
}

impl<'a> Dispatcher<'a> {
    pub(crate) const fn new(
        chains: &'a Chains,
        slot: &'a ConnectionSlot,
        config: &'a Arc<Config>,
    ) -> Self {
        Self {
            chains,
            slot,
            config,
        }
    }

    /// Send one command with the given retry behavior.
    pub(crate) async fn call(&self, command: Command, mode: CallMode) -> Result<Reply> {
        if command.is_empty() {
            return Err(Error::invalid_command("command has no tokens"));
        }

        self.run(&self.chains.call, mode.initial_attempt(), |attempt| {
            CallRequest::new(command.clone(), Arc::clone(self.config), attempt, mode)
        })
        .await
    }

    /// Send a batch in one round trip, retried as a whole.
    pub(crate) async fn call_pipelined(
        &self,
        commands: Arc<[Command]>,
        kind: BatchKind,
    ) -> Result<Vec<Reply>> {
        self.run(&self.chains.call_pipelined, Some(0), |attempt| {
            PipelineRequest::new(Arc::clone(&commands), Arc::clone(self.config), attempt, kind)
        })
        .await
    }

    /// Run the `connect` chain once and return the new connection.
    pub(crate) async fn connect(&self) -> Result<BoxConnection> {
        self.chains
            .connect
            .call(ConnectRequest::new(Arc::clone(self.config)))
            .await
    }

    /// Connect unless the client already holds a connection.
    ///
    /// A failure here propagates unchanged; it is never retried.
    pub(crate) async fn ensure_connected(&self) -> Result<()> {
        let mut connection = self.slot.lock().await;
        if connection.is_none() {
            debug!(server = %self.config.server(), "opening connection");
            *connection = Some(self.connect().await?);
        }
        Ok(())
    }

    async fn run<Op: Operation>(
        &self,
        chain: &SyncService<Op>,
        initial: Option<u32>,
        request: impl Fn(Option<u32>) -> Op,
    ) -> Result<Op::Output> {
        self.ensure_connected().await?;

        let policy = &self.config.reconnect;
        let mut state = State::Attempting(initial);

        loop {
            state = match state {
                State::Attempting(attempt) => {
                    match Outcome::from(chain.call(request(attempt)).await) {
                        Outcome::Succeeded(output) => return Ok(output),
                        Outcome::Fatal(err) => return Err(err),
                        Outcome::Retryable(err) => match attempt {
                            Some(attempt) if policy.allows_retry(attempt) => {
                                warn!(
                                    kind = %Op::KIND,
                                    attempt,
                                    error = %err,
                                    "connection failed, reconnecting"
                                );
                                State::Reconnecting(attempt)
                            }
                            _ => return Err(err),
                        },
                    }
                }
                State::Reconnecting(attempt) => {
                    self.reconnect(attempt).await?;
                    State::Attempting(Some(attempt + 1))
                }
            };
        }
    }

    async fn reconnect(&self, attempt: u32) -> Result<()> {
        if let Some(delay) = self
            .config
            .reconnect
            .delay(attempt)
            .filter(|delay| !delay.is_zero())
        {
            debug!(?delay, "waiting before reconnect");
            tokio::time::sleep(delay).await;
        }

        let mut connection = self.slot.lock().await;
        connection.take();
        *connection = Some(self.connect().await?);
        Ok(())
    }
}
