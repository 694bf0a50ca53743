//! Command queue and reply dispatcher.
//!
//! One background task owns the connection. Callers submit pre-encoded
//! requests over an mpsc channel; each request carries one completion slot
//! per command, pushed onto a FIFO pending queue in write order. The Nth
//! reply read always completes the Nth slot — the protocol guarantees
//! replies arrive in request order on a connection, and everything here
//! (pipelining, transactions, concurrent callers) leans on that.
//!
//! A multi-command batch travels as a single channel message, so its slots
//! land on the pending queue contiguously: no other caller's command can
//! interleave inside a batch.

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use crate::cmd::Command;
use crate::connection::Connection;
use crate::error::{RedisError, Result};
use crate::resp::Reply;

type Slot = oneshot::Sender<Result<Reply>>;

struct Request {
    bytes: BytesMut,
    slots: Vec<Slot>,
}

/// Cheap cloneable handle to the dispatch task.
#[derive(Clone)]
pub(crate) struct Handle {
    tx: mpsc::Sender<Request>,
}

impl Handle {
    /// Submit one command and await its correlated reply.
    ///
    /// Server error replies come back as `Ok(Reply::Error(..))`; lifting
    /// them into `Err` is the typed surface's job. Dropping the returned
    /// future does not retract the command: the dispatcher still consumes
    /// the eventual reply so later correlations stay aligned.
    pub async fn submit(&self, cmd: Command) -> Result<Reply> {
        let mut results = self.submit_batch(std::slice::from_ref(&cmd)).await?;
        match results.pop() {
            Some(result) => result,
            None => Err(RedisError::ConnectionClosed),
        }
    }

    /// Submit a batch as one write and await all replies in order.
    ///
    /// The outer `Err` means the request never reached the connection; the
    /// inner results are per-command.
    pub async fn submit_batch(&self, cmds: &[Command]) -> Result<Vec<Result<Reply>>> {
        let mut bytes = BytesMut::new();
        let mut slots = Vec::with_capacity(cmds.len());
        let mut receivers = Vec::with_capacity(cmds.len());
        for cmd in cmds {
            cmd.encode_to(&mut bytes);
            let (tx, rx) = oneshot::channel();
            slots.push(tx);
            receivers.push(rx);
        }

        self.tx
            .send(Request { bytes, slots })
            .await
            .map_err(|_| RedisError::ConnectionClosed)?;

        let mut results = Vec::with_capacity(receivers.len());
        for rx in receivers {
            results.push(match rx.await {
                Ok(result) => result,
                Err(_) => Err(RedisError::ConnectionClosed),
            });
        }
        Ok(results)
    }
}

/// Spawn the dispatch task around an established connection.
pub(crate) fn spawn<S>(conn: Connection<S>) -> Handle
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run(conn, rx));
    Handle { tx }
}

async fn run<S>(mut conn: Connection<S>, mut rx: mpsc::Receiver<Request>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut pending: VecDeque<Slot> = VecDeque::new();
    let mut open = true;

    loop {
        if !open && pending.is_empty() {
            // All handles dropped and every in-flight reply delivered.
            break;
        }

        let mut incoming: Option<Request> = None;

        tokio::select! {
            req = rx.recv(), if open => {
                match req {
                    Some(req) => incoming = Some(req),
                    // Handles gone; keep reading until pending drains.
                    None => open = false,
                }
            }
            reply = conn.read_reply(), if !pending.is_empty() => {
                match reply {
                    Ok(Some(reply)) => {
                        if let Some(slot) = pending.pop_front() {
                            // A cancelled caller has dropped its receiver;
                            // the slot is consumed regardless so the queue
                            // never skews.
                            let _ = slot.send(Ok(reply));
                        }
                    }
                    Ok(None) => {
                        tracing::debug!(
                            in_flight = pending.len(),
                            "server closed connection with requests in flight"
                        );
                        fail_all(&mut pending);
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, in_flight = pending.len(), "read failed");
                        fail_all(&mut pending);
                        break;
                    }
                }
            }
        }

        if let Some(req) = incoming {
            if let Err(e) = conn.write_frames(&req.bytes).await {
                tracing::error!(error = %e, "write failed");
                for slot in req.slots {
                    let _ = slot.send(Err(RedisError::ConnectionClosed));
                }
                fail_all(&mut pending);
                break;
            }
            pending.extend(req.slots);
        }
    }

    // Refuse anything still queued in the channel.
    rx.close();
    while let Ok(req) = rx.try_recv() {
        for slot in req.slots {
            let _ = slot.send(Err(RedisError::ConnectionClosed));
        }
    }
}

fn fail_all(pending: &mut VecDeque<Slot>) {
    for slot in pending.drain(..) {
        let _ = slot.send(Err(RedisError::ConnectionClosed));
    }
}
