//! Pipelines and transactions.
//!
//! A [`Batch`] collects commands inside a `pipelined` or `multi` scope
//! without doing any I/O. When the scope closes normally the whole batch is
//! sent once through the `call_pipelined` chain; each [`ReplyHandle`] is then
//! resolved with the reply at its position.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::dispatch::Dispatcher;
use crate::{Command, Error, Reply, Result};

/// Kind of batch being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Plain pipeline: commands are sent as-is.
    Pipeline,
    /// Transaction: commands are wrapped in `MULTI` / `EXEC`.
    Transaction,
}

impl BatchKind {
    /// Name as used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Transaction => "transaction",
        }
    }

    /// Position of the first user command in the sent sequence.
    const fn offset(self) -> usize {
        match self {
            Self::Pipeline => 0,
            Self::Transaction => 1,
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder for the reply of a batched command.
///
/// Empty until the batch is flushed. For transactions the handle holds the
/// server's queueing acknowledgement (usually `QUEUED`); the command's
/// actual result is part of the `EXEC` reply.
#[derive(Clone, Default)]
pub struct ReplyHandle {
    reply: Arc<OnceLock<Reply>>,
}

impl ReplyHandle {
    /// The reply, once the batch has been flushed.
    #[must_use]
    pub fn get(&self) -> Option<&Reply> {
        self.reply.get()
    }

    /// Returns `true` once the batch has been flushed successfully.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.reply.get().is_some()
    }

    fn resolve(&self, reply: Reply) {
        // A handle belongs to exactly one batch, flushed at most once.
        let _ = self.reply.set(reply);
    }
}

impl fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReplyHandle").field(&self.get()).finish()
    }
}

/// Commands accumulated inside a `pipelined` or `multi` scope.
///
/// # Example
///
/// ```ignore
/// let replies = client
///     .pipelined(|batch| {
///         batch.call(["SET", "greeting", "hello"]);
///         batch.call(["GET", "greeting"]);
///         Ok(())
///     })
///     .await?;
/// ```
#[derive(Debug)]
pub struct Batch {
    kind: BatchKind,
    commands: Vec<Command>,
    handles: Vec<ReplyHandle>,
}

impl Batch {
    pub(crate) const fn new(kind: BatchKind) -> Self {
        Self {
            kind,
            commands: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Queue a command. Nothing is sent until the scope closes.
    pub fn call(&mut self, command: impl Into<Command>) -> ReplyHandle {
        let handle = ReplyHandle::default();
        self.commands.push(command.into());
        self.handles.push(handle.clone());
        handle
    }

    /// Whether this is a pipeline or a transaction.
    #[must_use]
    pub const fn kind(&self) -> BatchKind {
        self.kind
    }

    /// Number of queued commands, transaction markers excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no command was queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The exact sequence to send, transaction markers included.
    fn into_parts(self) -> (Arc<[Command]>, Vec<ReplyHandle>) {
        let commands = match self.kind {
            BatchKind::Pipeline => self.commands,
            BatchKind::Transaction => {
                let mut wrapped = Vec::with_capacity(self.commands.len() + 2);
                wrapped.push(Command::from("MULTI"));
                wrapped.extend(self.commands);
                wrapped.push(Command::from("EXEC"));
                wrapped
            }
        };
        (commands.into(), self.handles)
    }

    /// Send the batch and resolve its handles.
    ///
    /// An empty batch sends nothing and returns no replies.
    pub(crate) async fn flush(self, dispatcher: &Dispatcher<'_>) -> Result<Vec<Reply>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(position) = self.commands.iter().position(Command::is_empty) {
            return Err(Error::invalid_command(format!(
                "command #{position} of the {} has no tokens",
                self.kind
            )));
        }

        let kind = self.kind;
        let (commands, handles) = self.into_parts();
        let expected = commands.len();

        let replies = dispatcher.call_pipelined(commands, kind).await?;
        // The terminal checks what the connection returned; a mismatch here
        // comes from a middleware answering in its place.
        if replies.len() != expected {
            return Err(Error::other(format!(
                "middleware returned {} replies for {expected} commands",
                replies.len()
            )));
        }

        for (handle, reply) in handles.iter().zip(replies.iter().skip(kind.offset())) {
            handle.resolve(reply.clone());
        }
        Ok(replies)
    }
}
