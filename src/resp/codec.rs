//! Incremental RESP reply decoder.
//!
//! `decode` pulls exactly one reply off the front of the read buffer when a
//! complete one is available, and reports `Ok(None)` otherwise so the
//! connection can keep buffering. Nothing is consumed until a full reply
//! (including every element of a nested array) has arrived.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{RedisError, Result};
use crate::resp::Reply;

enum Parsed {
    Complete(Reply, usize),
    Incomplete,
    Invalid(String),
}

/// Decode one reply from the front of `buf`, advancing past it.
///
/// Returns `Ok(None)` when the buffer holds only a partial reply.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Reply>> {
    match parse(&buf[..]) {
        Parsed::Complete(reply, consumed) => {
            buf.advance(consumed);
            Ok(Some(reply))
        }
        Parsed::Incomplete => Ok(None),
        Parsed::Invalid(msg) => Err(RedisError::Protocol(msg)),
    }
}

fn parse(buffer: &[u8]) -> Parsed {
    if buffer.is_empty() {
        return Parsed::Incomplete;
    }

    match buffer[0] {
        b'+' => parse_line(buffer, Reply::Simple),
        b'-' => parse_line(buffer, Reply::Error),
        b':' => parse_integer(buffer),
        b'$' => parse_bulk(buffer),
        b'*' => parse_array(buffer),
        other => Parsed::Invalid(format!("unknown reply type byte: 0x{:02x}", other)),
    }
}

/// Position of `\r` in the first CRLF pair, if any.
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    (0..buffer.len().saturating_sub(1)).find(|&i| buffer[i] == b'\r' && buffer[i + 1] == b'\n')
}

fn line_str(buffer: &[u8], end: usize) -> std::result::Result<&str, Parsed> {
    std::str::from_utf8(&buffer[1..end])
        .map_err(|_| Parsed::Invalid("non-utf8 reply line".to_string()))
}

fn parse_line(buffer: &[u8], build: fn(String) -> Reply) -> Parsed {
    let Some(end) = find_crlf(buffer) else {
        return Parsed::Incomplete;
    };
    match line_str(buffer, end) {
        Ok(s) => Parsed::Complete(build(s.to_string()), end + 2),
        Err(e) => e,
    }
}

fn parse_integer(buffer: &[u8]) -> Parsed {
    let Some(end) = find_crlf(buffer) else {
        return Parsed::Incomplete;
    };
    let s = match line_str(buffer, end) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match s.parse::<i64>() {
        Ok(n) => Parsed::Complete(Reply::Integer(n), end + 2),
        Err(_) => Parsed::Invalid(format!("invalid integer reply: {s:?}")),
    }
}

fn parse_length(buffer: &[u8], end: usize) -> std::result::Result<i64, Parsed> {
    let s = line_str(buffer, end)?;
    s.parse::<i64>()
        .map_err(|_| Parsed::Invalid(format!("invalid length prefix: {s:?}")))
}

fn parse_bulk(buffer: &[u8]) -> Parsed {
    let Some(len_end) = find_crlf(buffer) else {
        return Parsed::Incomplete;
    };
    let len = match parse_length(buffer, len_end) {
        Ok(n) => n,
        Err(e) => return e,
    };

    if len < 0 {
        return Parsed::Complete(Reply::Bulk(None), len_end + 2);
    }

    let len = len as usize;
    let data_start = len_end + 2;
    let data_end = data_start + len;
    let total = data_end + 2;

    if buffer.len() < total {
        return Parsed::Incomplete;
    }
    if &buffer[data_end..total] != b"\r\n" {
        return Parsed::Invalid("bulk string missing trailing CRLF".to_string());
    }

    let data = Bytes::copy_from_slice(&buffer[data_start..data_end]);
    Parsed::Complete(Reply::Bulk(Some(data)), total)
}

fn parse_array(buffer: &[u8]) -> Parsed {
    let Some(len_end) = find_crlf(buffer) else {
        return Parsed::Incomplete;
    };
    let len = match parse_length(buffer, len_end) {
        Ok(n) => n,
        Err(e) => return e,
    };

    if len < 0 {
        return Parsed::Complete(Reply::Array(None), len_end + 2);
    }

    let len = len as usize;
    let mut offset = len_end + 2;
    let mut items = Vec::with_capacity(len);

    for _ in 0..len {
        match parse(&buffer[offset..]) {
            Parsed::Complete(reply, consumed) => {
                items.push(reply);
                offset += consumed;
            }
            Parsed::Incomplete => return Parsed::Incomplete,
            invalid => return invalid,
        }
    }

    Parsed::Complete(Reply::Array(Some(items)), offset)
}
