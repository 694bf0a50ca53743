//! Client-side command batching: pipelines and MULTI/EXEC transactions.
//!
//! Both builders buffer commands locally and flush them as one atomic batch
//! write on `exec`. `exec` takes `self` by value, so a builder cannot be
//! reused after execution — the single-use rule is enforced at compile time.

use crate::cmd::Command;
use crate::dispatcher::Handle;
use crate::error::{RedisError, Result};
use crate::resp::Reply;

/// A pipeline: N commands, one write, N replies in submission order.
///
/// Per-command server errors are surfaced individually in the result
/// vector; one failing command never affects its siblings.
pub struct Pipeline {
    handle: Handle,
    cmds: Vec<Command>,
}

impl Pipeline {
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            handle,
            cmds: Vec::new(),
        }
    }

    /// Queue an arbitrary command.
    pub fn cmd(&mut self, cmd: Command) -> &mut Self {
        self.cmds.push(cmd);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Vec<u8>>) -> &mut Self {
        self.cmd(Command::new("SET").arg(key).arg(value))
    }

    pub fn set_ex(&mut self, key: &str, seconds: u64, value: impl Into<Vec<u8>>) -> &mut Self {
        self.cmd(Command::new("SETEX").arg(key).arg_uint(seconds).arg(value))
    }

    pub fn get(&mut self, key: &str) -> &mut Self {
        self.cmd(Command::new("GET").arg(key))
    }

    pub fn del(&mut self, key: &str) -> &mut Self {
        self.cmd(Command::new("DEL").arg(key))
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Flush the batch and await every reply in order.
    pub async fn exec(self) -> Result<Vec<Result<Reply>>> {
        if self.cmds.is_empty() {
            return Ok(Vec::new());
        }
        let results = self.handle.submit_batch(&self.cmds).await?;
        Ok(results
            .into_iter()
            .map(|r| r.and_then(Reply::into_result))
            .collect())
    }
}

/// A MULTI/EXEC transaction: the queued commands execute atomically on the
/// server.
///
/// On the wire this is `MULTI`, the N commands, `EXEC`, sent as one batch
/// so nothing else on this connection can interleave inside the window.
/// The EXEC reply envelope (an array of per-command results) is unwrapped
/// so the caller sees the same shape a pipeline produces.
pub struct Transaction {
    handle: Handle,
    cmds: Vec<Command>,
}

impl Transaction {
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            handle,
            cmds: Vec::new(),
        }
    }

    pub fn cmd(&mut self, cmd: Command) -> &mut Self {
        self.cmds.push(cmd);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Vec<u8>>) -> &mut Self {
        self.cmd(Command::new("SET").arg(key).arg(value))
    }

    pub fn set_ex(&mut self, key: &str, seconds: u64, value: impl Into<Vec<u8>>) -> &mut Self {
        self.cmd(Command::new("SETEX").arg(key).arg_uint(seconds).arg(value))
    }

    pub fn get(&mut self, key: &str) -> &mut Self {
        self.cmd(Command::new("GET").arg(key))
    }

    pub fn del(&mut self, key: &str) -> &mut Self {
        self.cmd(Command::new("DEL").arg(key))
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Execute the transaction and await the per-command results.
    ///
    /// A null EXEC array (the server discarded the transaction after a
    /// watched-key conflict) maps to [`RedisError::TransactionAborted`].
    pub async fn exec(self) -> Result<Vec<Result<Reply>>> {
        if self.cmds.is_empty() {
            return Ok(Vec::new());
        }

        let mut batch = Vec::with_capacity(self.cmds.len() + 2);
        batch.push(Command::new("MULTI"));
        batch.extend(self.cmds);
        batch.push(Command::new("EXEC"));

        let mut results = self.handle.submit_batch(&batch).await?;

        // Last reply is the EXEC envelope; everything before it is the
        // MULTI ack plus one QUEUED ack per command.
        let exec_reply = match results.pop() {
            Some(r) => r?,
            None => return Err(RedisError::ConnectionClosed),
        };
        let mut acks = results.into_iter();
        match acks.next() {
            Some(multi) => {
                multi?.into_status()?;
            }
            None => return Err(RedisError::ConnectionClosed),
        }
        for ack in acks {
            // A command rejected at queue time (e.g. bad arity) fails the
            // whole transaction; the server will also error the EXEC.
            ack?.into_result()?;
        }

        match exec_reply.into_result()? {
            Reply::Array(None) => Err(RedisError::TransactionAborted),
            Reply::Array(Some(items)) => {
                Ok(items.into_iter().map(Reply::into_result).collect())
            }
            other => Err(RedisError::UnexpectedReply {
                expected: "array",
                got: other.kind(),
            }),
        }
    }
}
