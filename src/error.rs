use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedisError {
    /// Malformed bytes from the server. Fatal to the connection: the stream
    /// position can no longer be trusted, so the connection is torn down and
    /// every pending request fails.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A well-formed error reply (e.g. WRONGTYPE). Scoped to the one command
    /// that produced it; the connection stays usable.
    #[error("server error: {0}")]
    Server(String),

    /// Transport failure while connecting or mid-conversation.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The connection was closed (or the dispatcher shut down) with this
    /// request still in flight. Never retried automatically.
    #[error("connection closed with request in flight")]
    ConnectionClosed,

    /// Connect or per-command deadline exceeded.
    #[error("operation timed out")]
    Timeout,

    /// Local argument validation failed; nothing was sent.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// EXEC returned a null array: the transaction was discarded by the
    /// server (watched-key conflict).
    #[error("transaction aborted")]
    TransactionAborted,

    /// A reply arrived with a shape the command does not produce.
    #[error("unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply {
        expected: &'static str,
        got: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, RedisError>;
