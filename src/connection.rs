//! A single owned transport stream plus its read/write cursors.
//!
//! The connection is the only component that touches the socket. It buffers
//! inbound bytes and hands out one decoded reply at a time; the dispatcher
//! drives it and correlates replies to callers.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::cmd::Command;
use crate::config::ConnectOptions;
use crate::error::{RedisError, Result};
use crate::resp::{self, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Failed,
}

/// Exclusive owner of one transport stream.
///
/// Generic over the stream so tests can drive it with `tokio::io::duplex`;
/// production code uses [`Connection::connect`] and a `TcpStream`.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
}

impl Connection<TcpStream> {
    /// Establish a TCP connection, bounded by the configured connect
    /// timeout, and select the logical database if one is configured.
    pub async fn connect(opts: &ConnectOptions) -> Result<Self> {
        let addr = opts.addr();
        tracing::debug!(%addr, "connecting");

        let stream = tokio::time::timeout(opts.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| RedisError::Timeout)??;

        let mut conn = Self {
            stream,
            buffer: BytesMut::with_capacity(4 * 1024),
            state: ConnectionState::Connecting,
        };

        if opts.db != 0 {
            let select = Command::new("SELECT").arg_uint(opts.db as u64);
            conn.write_frames(&select.encode()).await?;
            match conn.read_reply().await? {
                Some(reply) => {
                    reply.into_status()?;
                }
                None => return Err(RedisError::ConnectionClosed),
            }
        }

        conn.state = ConnectionState::Ready;
        tracing::debug!(%addr, db = opts.db, "connected");
        Ok(conn)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wrap an already-established stream (tests, proxied transports).
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4 * 1024),
            state: ConnectionState::Ready,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Write pre-encoded request frames. A batch arrives here as one
    /// contiguous byte run, so pipelined commands go out in a single write.
    pub async fn write_frames(&mut self, bytes: &[u8]) -> Result<()> {
        if let Err(e) = self.write_inner(bytes).await {
            self.state = ConnectionState::Failed;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_inner(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Pull one decoded reply, reading more bytes whenever the buffer holds
    /// only a partial frame. `Ok(None)` is a clean EOF between replies.
    ///
    /// Cancel-safe: the only await is `read_buf`, and buffered bytes persist
    /// in `self.buffer` across polls.
    pub async fn read_reply(&mut self) -> Result<Option<Reply>> {
        loop {
            match resp::decode(&mut self.buffer) {
                Ok(Some(reply)) => return Ok(Some(reply)),
                Ok(None) => {}
                Err(e) => {
                    self.state = ConnectionState::Failed;
                    return Err(e);
                }
            }

            let n = match self.stream.read_buf(&mut self.buffer).await {
                Ok(n) => n,
                Err(e) => {
                    self.state = ConnectionState::Failed;
                    return Err(e.into());
                }
            };

            if n == 0 {
                if self.buffer.is_empty() {
                    self.state = ConnectionState::Disconnected;
                    return Ok(None);
                }
                self.state = ConnectionState::Failed;
                return Err(RedisError::Protocol(
                    "connection closed mid-reply".to_string(),
                ));
            }
        }
    }
}
