use bytes::Bytes;

use crate::error::{RedisError, Result};

/// One decoded reply from the server.
///
/// A null bulk string (`$-1`) and a null array (`*-1`) are distinct: the
/// former is an absent value, the latter is how blocking reads and aborted
/// transactions signal "nothing". Arrays nest arbitrarily (geo, stream, and
/// EXEC replies).
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Reply>>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    pub fn null() -> Self {
        Reply::Bulk(None)
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(bytes.into()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Simple(_) => "simple string",
            Reply::Error(_) => "error",
            Reply::Integer(_) => "integer",
            Reply::Bulk(Some(_)) => "bulk string",
            Reply::Bulk(None) => "null bulk string",
            Reply::Array(Some(_)) => "array",
            Reply::Array(None) => "null array",
        }
    }

    /// Lift a server error reply into `Err`, leaving every other variant
    /// untouched. Applied at the typed surface so a `-ERR` only fails the
    /// caller whose command produced it.
    pub fn into_result(self) -> Result<Reply> {
        match self {
            Reply::Error(msg) => Err(RedisError::Server(msg)),
            other => Ok(other),
        }
    }

    /// Status reply, e.g. `+OK` or `+PONG`.
    pub fn into_status(self) -> Result<String> {
        match self.into_result()? {
            Reply::Simple(s) => Ok(s),
            other => Err(other.unexpected("simple string")),
        }
    }

    pub fn into_integer(self) -> Result<i64> {
        match self.into_result()? {
            Reply::Integer(n) => Ok(n),
            other => Err(other.unexpected("integer")),
        }
    }

    /// Bulk string payload; a null bulk string maps to `None`.
    pub fn into_bytes(self) -> Result<Option<Bytes>> {
        match self.into_result()? {
            Reply::Bulk(b) => Ok(b),
            other => Err(other.unexpected("bulk string")),
        }
    }

    /// Bulk or simple string as UTF-8 text.
    pub fn into_string(self) -> Result<Option<String>> {
        match self.into_result()? {
            Reply::Simple(s) => Ok(Some(s)),
            Reply::Bulk(None) => Ok(None),
            Reply::Bulk(Some(b)) => String::from_utf8(b.to_vec())
                .map(Some)
                .map_err(|_| RedisError::Protocol("non-utf8 bulk string".to_string())),
            other => Err(other.unexpected("string")),
        }
    }

    /// Array elements; a null array maps to `None`.
    pub fn into_array(self) -> Result<Option<Vec<Reply>>> {
        match self.into_result()? {
            Reply::Array(items) => Ok(items),
            other => Err(other.unexpected("array")),
        }
    }

    fn unexpected(self, expected: &'static str) -> RedisError {
        RedisError::UnexpectedReply {
            expected,
            got: self.kind(),
        }
    }
}
