//! Command representation and request-frame encoding.
//!
//! A command is an ordered sequence of argument byte-strings (name first)
//! and is immutable once handed to the dispatcher. On the wire it becomes
//! an array of bulk strings; the length prefixes must be byte-exact or the
//! stream is corrupted irrecoverably, so encoding is centralized here.

use bytes::BytesMut;

/// One Redis command: name plus arguments, each a binary-safe byte-string.
#[derive(Debug, Clone)]
pub struct Command {
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: &str) -> Self {
        Self {
            args: vec![name.as_bytes().to_vec()],
        }
    }

    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_int(self, n: i64) -> Self {
        self.arg(n.to_string())
    }

    pub fn arg_uint(self, n: u64) -> Self {
        self.arg(n.to_string())
    }

    /// Scores and coordinates travel as decimal text.
    pub fn arg_float(self, f: f64) -> Self {
        self.arg(f.to_string())
    }

    pub fn name(&self) -> &[u8] {
        &self.args[0]
    }

    /// Append the request frame: `*<n>\r\n` then `$<len>\r\n<arg>\r\n` per
    /// argument.
    pub fn encode_to(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(b"*");
        buf.extend_from_slice(self.args.len().to_string().as_bytes());
        buf.extend_from_slice(b"\r\n");
        for arg in &self.args {
            buf.extend_from_slice(b"$");
            buf.extend_from_slice(arg.len().to_string().as_bytes());
            buf.extend_from_slice(b"\r\n");
            buf.extend_from_slice(arg);
            buf.extend_from_slice(b"\r\n");
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.encode_to(&mut buf);
        buf
    }
}
