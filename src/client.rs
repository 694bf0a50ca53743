//! Client handle and typed command surface.
//!
//! One method per command family: arguments are validated locally (a bad
//! call never touches the connection), the command goes through the
//! dispatcher, and the raw reply is mapped into a domain type. Server error
//! replies surface as [`RedisError::Server`] on the specific call that
//! caused them; the connection stays usable.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::batch::{Pipeline, Transaction};
use crate::cmd::Command;
use crate::config::ConnectOptions;
use crate::connection::Connection;
use crate::dispatcher::{self, Handle};
use crate::error::{RedisError, Result};
use crate::resp::Reply;
use crate::types::{GeoMember, GeoUnit, StreamEntry, StreamKey, XReadOptions, ZMember};

/// Handle to one Redis connection.
///
/// Cloning is cheap and clones share the connection; replies always reach
/// the caller whose command produced them, in submission order.
#[derive(Clone)]
pub struct Client {
    handle: Handle,
    command_timeout: Option<Duration>,
}

impl Client {
    pub async fn connect(opts: ConnectOptions) -> Result<Client> {
        let conn = Connection::connect(&opts).await?;
        Ok(Self {
            handle: dispatcher::spawn(conn),
            command_timeout: opts.command_timeout,
        })
    }

    /// Wrap an already-established connection (custom transports, tests).
    pub fn from_connection<S>(conn: Connection<S>, command_timeout: Option<Duration>) -> Client
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            handle: dispatcher::spawn(conn),
            command_timeout,
        }
    }

    /// Send a raw command. Escape hatch for commands without a typed method.
    pub async fn send(&self, cmd: Command) -> Result<Reply> {
        self.run(cmd).await
    }

    async fn run(&self, cmd: Command) -> Result<Reply> {
        let fut = self.handle.submit(cmd);
        let reply = match self.command_timeout {
            Some(t) => tokio::time::timeout(t, fut)
                .await
                .map_err(|_| RedisError::Timeout)?,
            None => fut.await,
        }?;
        reply.into_result()
    }

    /// Like `run` but exempt from the per-command timeout; used for
    /// blocking reads whose bound is the caller's BLOCK argument.
    async fn run_blocking(&self, cmd: Command) -> Result<Reply> {
        self.handle.submit(cmd).await?.into_result()
    }

    // --- connection ---

    pub async fn ping(&self) -> Result<String> {
        self.run(Command::new("PING")).await?.into_status()
    }

    pub async fn echo(&self, message: impl Into<Vec<u8>>) -> Result<Bytes> {
        self.run(Command::new("ECHO").arg(message))
            .await?
            .into_bytes()?
            .ok_or(RedisError::UnexpectedReply {
                expected: "bulk string",
                got: "null bulk string",
            })
    }

    /// Graceful shutdown: QUIT is acknowledged after every request ahead of
    /// it has been answered, so in-flight work drains before the server
    /// closes the stream.
    pub async fn quit(&self) -> Result<()> {
        self.run(Command::new("QUIT")).await?.into_status()?;
        Ok(())
    }

    // --- strings ---

    pub async fn set(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<()> {
        self.run(Command::new("SET").arg(key).arg(value))
            .await?
            .into_status()?;
        Ok(())
    }

    /// SET with a TTL in seconds. The expiry is enforced server-side; after
    /// it passes, `get` returns `None`.
    pub async fn set_ex(&self, key: &str, seconds: u64, value: impl Into<Vec<u8>>) -> Result<()> {
        if seconds == 0 {
            return Err(RedisError::Argument(
                "SETEX requires a positive expiry".to_string(),
            ));
        }
        self.run(Command::new("SETEX").arg(key).arg_uint(seconds).arg(value))
            .await?
            .into_status()?;
        Ok(())
    }

    /// `None` means the key is absent (or expired) — not an error.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.run(Command::new("GET").arg(key)).await?.into_bytes()
    }

    pub async fn del(&self, keys: &[&str]) -> Result<i64> {
        if keys.is_empty() {
            return Err(RedisError::Argument("DEL requires at least one key".to_string()));
        }
        let mut cmd = Command::new("DEL");
        for key in keys {
            cmd = cmd.arg(*key);
        }
        self.run(cmd).await?.into_integer()
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.run(Command::new("EXISTS").arg(key)).await?.into_integer()? > 0)
    }

    pub async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        Ok(self
            .run(Command::new("EXPIRE").arg(key).arg_uint(seconds))
            .await?
            .into_integer()?
            == 1)
    }

    pub async fn ttl(&self, key: &str) -> Result<i64> {
        self.run(Command::new("TTL").arg(key)).await?.into_integer()
    }

    // --- lists ---

    pub async fn lpush(&self, key: &str, values: &[&[u8]]) -> Result<i64> {
        self.push("LPUSH", key, values).await
    }

    pub async fn rpush(&self, key: &str, values: &[&[u8]]) -> Result<i64> {
        self.push("RPUSH", key, values).await
    }

    async fn push(&self, name: &str, key: &str, values: &[&[u8]]) -> Result<i64> {
        if values.is_empty() {
            return Err(RedisError::Argument(format!(
                "{name} requires at least one value"
            )));
        }
        let mut cmd = Command::new(name).arg(key);
        for value in values {
            cmd = cmd.arg(*value);
        }
        self.run(cmd).await?.into_integer()
    }

    pub async fn lpop(&self, key: &str) -> Result<Option<Bytes>> {
        self.run(Command::new("LPOP").arg(key)).await?.into_bytes()
    }

    pub async fn rpop(&self, key: &str) -> Result<Option<Bytes>> {
        self.run(Command::new("RPOP").arg(key)).await?.into_bytes()
    }

    pub async fn llen(&self, key: &str) -> Result<i64> {
        self.run(Command::new("LLEN").arg(key)).await?.into_integer()
    }

    /// Inclusive on both ends; negative indices count from the tail
    /// (-1 is the last element).
    pub async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>> {
        let reply = self
            .run(Command::new("LRANGE").arg(key).arg_int(start).arg_int(stop))
            .await?;
        bulk_items(reply)
    }

    // --- sets ---

    /// Idempotent: re-adding a member does not grow the set. Returns the
    /// number of members that were actually new.
    pub async fn sadd(&self, key: &str, members: &[&[u8]]) -> Result<i64> {
        if members.is_empty() {
            return Err(RedisError::Argument(
                "SADD requires at least one member".to_string(),
            ));
        }
        let mut cmd = Command::new("SADD").arg(key);
        for member in members {
            cmd = cmd.arg(*member);
        }
        self.run(cmd).await?.into_integer()
    }

    pub async fn scard(&self, key: &str) -> Result<i64> {
        self.run(Command::new("SCARD").arg(key)).await?.into_integer()
    }

    /// Member order is server-defined; do not rely on it.
    pub async fn smembers(&self, key: &str) -> Result<Vec<Bytes>> {
        let reply = self.run(Command::new("SMEMBERS").arg(key)).await?;
        bulk_items(reply)
    }

    pub async fn sismember(&self, key: &str, member: impl Into<Vec<u8>>) -> Result<bool> {
        Ok(self
            .run(Command::new("SISMEMBER").arg(key).arg(member))
            .await?
            .into_integer()?
            == 1)
    }

    // --- sorted sets ---

    pub async fn zadd(&self, key: &str, members: &[ZMember]) -> Result<i64> {
        if members.is_empty() {
            return Err(RedisError::Argument(
                "ZADD requires at least one member".to_string(),
            ));
        }
        let mut cmd = Command::new("ZADD").arg(key);
        for m in members {
            cmd = cmd.arg_float(m.score).arg(m.member.clone());
        }
        self.run(cmd).await?.into_integer()
    }

    pub async fn zcard(&self, key: &str) -> Result<i64> {
        self.run(Command::new("ZCARD").arg(key)).await?.into_integer()
    }

    /// Ascending by score, ties broken lexicographically by member.
    pub async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>> {
        let reply = self
            .run(Command::new("ZRANGE").arg(key).arg_int(start).arg_int(stop))
            .await?;
        bulk_items(reply)
    }

    pub async fn zscore(&self, key: &str, member: impl Into<Vec<u8>>) -> Result<Option<f64>> {
        let bytes = self
            .run(Command::new("ZSCORE").arg(key).arg(member))
            .await?
            .into_bytes()?;
        bytes.map(|b| parse_float(&b)).transpose()
    }

    /// Remove and return the highest-scored member. The score comes back as
    /// the decimal text the server sent, so the original numeric value
    /// round-trips exactly.
    pub async fn zpopmax(&self, key: &str) -> Result<Option<(Bytes, String)>> {
        let reply = self.run(Command::new("ZPOPMAX").arg(key)).await?;
        let items = reply.into_array()?.unwrap_or_default();
        if items.is_empty() {
            return Ok(None);
        }
        let mut items = items.into_iter();
        let member = expect_bulk(items.next())?;
        let score = expect_bulk(items.next())?;
        let score = String::from_utf8(score.to_vec())
            .map_err(|_| RedisError::Protocol("non-utf8 score".to_string()))?;
        Ok(Some((member, score)))
    }

    // --- hashes ---

    pub async fn hset(&self, key: &str, fields: &[(&str, &[u8])]) -> Result<i64> {
        if fields.is_empty() {
            return Err(RedisError::Argument(
                "HSET requires at least one field".to_string(),
            ));
        }
        let mut cmd = Command::new("HSET").arg(key);
        for (field, value) in fields {
            cmd = cmd.arg(*field).arg(*value);
        }
        self.run(cmd).await?.into_integer()
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<Bytes>> {
        self.run(Command::new("HGET").arg(key).arg(field))
            .await?
            .into_bytes()
    }

    /// The returned mapping holds exactly the fields currently set.
    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, Bytes>> {
        let reply = self.run(Command::new("HGETALL").arg(key)).await?;
        let items = reply.into_array()?.unwrap_or_default();
        if items.len() % 2 != 0 {
            return Err(RedisError::Protocol(
                "HGETALL reply has odd element count".to_string(),
            ));
        }
        let mut map = HashMap::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            let field = expect_bulk(Some(field))?;
            let field = String::from_utf8(field.to_vec())
                .map_err(|_| RedisError::Protocol("non-utf8 hash field".to_string()))?;
            map.insert(field, expect_bulk(Some(value))?);
        }
        Ok(map)
    }

    // --- geo ---

    pub async fn geoadd(&self, key: &str, members: &[GeoMember]) -> Result<i64> {
        if members.is_empty() {
            return Err(RedisError::Argument(
                "GEOADD requires at least one member".to_string(),
            ));
        }
        for m in members {
            if !(-180.0..=180.0).contains(&m.longitude) || !(-85.06..=85.06).contains(&m.latitude)
            {
                return Err(RedisError::Argument(format!(
                    "coordinates out of range: {} {}",
                    m.longitude, m.latitude
                )));
            }
        }
        let mut cmd = Command::new("GEOADD").arg(key);
        for m in members {
            cmd = cmd
                .arg_float(m.longitude)
                .arg_float(m.latitude)
                .arg(m.member.clone());
        }
        self.run(cmd).await?.into_integer()
    }

    /// Distance between two members in the requested unit; `None` when
    /// either member is missing from the index.
    pub async fn geodist(
        &self,
        key: &str,
        member1: &str,
        member2: &str,
        unit: GeoUnit,
    ) -> Result<Option<f64>> {
        let bytes = self
            .run(
                Command::new("GEODIST")
                    .arg(key)
                    .arg(member1)
                    .arg(member2)
                    .arg(unit.as_str()),
            )
            .await?
            .into_bytes()?;
        bytes.map(|b| parse_float(&b)).transpose()
    }

    /// GEOSEARCH FROMLONLAT ... BYRADIUS: member names within `radius` of
    /// the given point.
    pub async fn geosearch(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        radius: f64,
        unit: GeoUnit,
    ) -> Result<Vec<Bytes>> {
        if radius <= 0.0 {
            return Err(RedisError::Argument(
                "GEOSEARCH radius must be positive".to_string(),
            ));
        }
        let reply = self
            .run(
                Command::new("GEOSEARCH")
                    .arg(key)
                    .arg("FROMLONLAT")
                    .arg_float(longitude)
                    .arg_float(latitude)
                    .arg("BYRADIUS")
                    .arg_float(radius)
                    .arg(unit.as_str()),
            )
            .await?;
        bulk_items(reply)
    }

    // --- hyperloglog ---

    /// Returns true when the estimator's internal state changed.
    pub async fn pfadd(&self, key: &str, elements: &[&[u8]]) -> Result<bool> {
        if elements.is_empty() {
            return Err(RedisError::Argument(
                "PFADD requires at least one element".to_string(),
            ));
        }
        let mut cmd = Command::new("PFADD").arg(key);
        for element in elements {
            cmd = cmd.arg(*element);
        }
        Ok(self.run(cmd).await?.into_integer()? == 1)
    }

    /// Approximate cardinality; the estimate is the server's, passed through.
    pub async fn pfcount(&self, keys: &[&str]) -> Result<i64> {
        if keys.is_empty() {
            return Err(RedisError::Argument(
                "PFCOUNT requires at least one key".to_string(),
            ));
        }
        let mut cmd = Command::new("PFCOUNT");
        for key in keys {
            cmd = cmd.arg(*key);
        }
        self.run(cmd).await?.into_integer()
    }

    // --- streams ---

    /// Append an entry; `id` is usually `"*"` for a server-assigned id.
    /// Returns the id actually assigned.
    pub async fn xadd(&self, key: &str, id: &str, fields: &[(&str, &[u8])]) -> Result<String> {
        if id.is_empty() {
            return Err(RedisError::Argument("XADD requires an id".to_string()));
        }
        if fields.is_empty() {
            return Err(RedisError::Argument(
                "XADD requires at least one field".to_string(),
            ));
        }
        let mut cmd = Command::new("XADD").arg(key).arg(id);
        for (field, value) in fields {
            cmd = cmd.arg(*field).arg(*value);
        }
        let bytes = self
            .run(cmd)
            .await?
            .into_bytes()?
            .ok_or(RedisError::UnexpectedReply {
                expected: "bulk string",
                got: "null bulk string",
            })?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| RedisError::Protocol("non-utf8 stream id".to_string()))
    }

    /// Create a consumer group positioned at `id` (`"0"` = from the start,
    /// `"$"` = new entries only).
    pub async fn xgroup_create(&self, key: &str, group: &str, id: &str) -> Result<()> {
        self.run(
            Command::new("XGROUP")
                .arg("CREATE")
                .arg(key)
                .arg(group)
                .arg(id),
        )
        .await?
        .into_status()?;
        Ok(())
    }

    /// Returns true when the consumer was newly created.
    pub async fn xgroup_create_consumer(
        &self,
        key: &str,
        group: &str,
        consumer: &str,
    ) -> Result<bool> {
        Ok(self
            .run(
                Command::new("XGROUP")
                    .arg("CREATECONSUMER")
                    .arg(key)
                    .arg(group)
                    .arg(consumer),
            )
            .await?
            .into_integer()?
            == 1)
    }

    /// Acknowledge delivered entries, removing them from the consumer's
    /// pending list. Returns how many ids were actually acknowledged.
    pub async fn xack(&self, key: &str, group: &str, ids: &[&str]) -> Result<i64> {
        if ids.is_empty() {
            return Err(RedisError::Argument(
                "XACK requires at least one id".to_string(),
            ));
        }
        let mut cmd = Command::new("XACK").arg(key).arg(group);
        for id in ids {
            cmd = cmd.arg(*id);
        }
        self.run(cmd).await?.into_integer()
    }

    /// Read new entries for a consumer. With `XReadOptions::block` set the
    /// server holds the read open up to that long; expiry without data
    /// yields `Ok(None)`. While blocked, this command occupies the shared
    /// connection's reply slot, so replies to later commands queue behind
    /// it — use a dedicated connection for concurrent blocking readers.
    ///
    /// `streams` pairs each key with a cursor id (`">"` = entries never
    /// delivered to this group).
    pub async fn xreadgroup(
        &self,
        group: &str,
        consumer: &str,
        opts: XReadOptions,
        streams: &[(&str, &str)],
    ) -> Result<Option<Vec<StreamKey>>> {
        if streams.is_empty() {
            return Err(RedisError::Argument(
                "XREADGROUP requires at least one stream".to_string(),
            ));
        }
        let mut cmd = Command::new("XREADGROUP")
            .arg("GROUP")
            .arg(group)
            .arg(consumer);
        if let Some(count) = opts.count {
            cmd = cmd.arg("COUNT").arg_uint(count);
        }
        if let Some(block) = opts.block {
            cmd = cmd.arg("BLOCK").arg_uint(block.as_millis() as u64);
        }
        cmd = cmd.arg("STREAMS");
        for (key, _) in streams {
            cmd = cmd.arg(*key);
        }
        for (_, id) in streams {
            cmd = cmd.arg(*id);
        }

        let reply = if opts.block.is_some() {
            self.run_blocking(cmd).await?
        } else {
            self.run(cmd).await?
        };
        parse_stream_keys(reply)
    }

    // --- batching ---

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.handle.clone())
    }

    /// Begin a MULTI/EXEC transaction builder.
    pub fn multi(&self) -> Transaction {
        Transaction::new(self.handle.clone())
    }

    /// WATCH keys for the optimistic-locking variant of transactions; a
    /// conflicting external write makes the next EXEC abort.
    pub async fn watch(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Err(RedisError::Argument(
                "WATCH requires at least one key".to_string(),
            ));
        }
        let mut cmd = Command::new("WATCH");
        for key in keys {
            cmd = cmd.arg(*key);
        }
        self.run(cmd).await?.into_status()?;
        Ok(())
    }

    pub async fn unwatch(&self) -> Result<()> {
        self.run(Command::new("UNWATCH")).await?.into_status()?;
        Ok(())
    }
}

/// An array of bulk strings; a null array maps to empty.
fn bulk_items(reply: Reply) -> Result<Vec<Bytes>> {
    let items = reply.into_array()?.unwrap_or_default();
    items.into_iter().map(|item| expect_bulk(Some(item))).collect()
}

fn expect_bulk(item: Option<Reply>) -> Result<Bytes> {
    match item {
        Some(Reply::Bulk(Some(bytes))) => Ok(bytes),
        Some(other) => Err(RedisError::UnexpectedReply {
            expected: "bulk string",
            got: other.kind(),
        }),
        None => Err(RedisError::Protocol("truncated array reply".to_string())),
    }
}

fn parse_float(bytes: &Bytes) -> Result<f64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RedisError::Protocol("invalid float reply".to_string()))
}

fn parse_string(item: Option<Reply>) -> Result<String> {
    let bytes = expect_bulk(item)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| RedisError::Protocol("non-utf8 reply element".to_string()))
}

/// XREADGROUP reply: null array on block timeout, otherwise
/// `[[key, [[id, [field, value, ...]], ...]], ...]`.
fn parse_stream_keys(reply: Reply) -> Result<Option<Vec<StreamKey>>> {
    let Some(items) = reply.into_array()? else {
        return Ok(None);
    };
    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        let mut pair = match item.into_array()? {
            Some(pair) => pair.into_iter(),
            None => return Err(RedisError::Protocol("null stream element".to_string())),
        };
        let key = parse_string(pair.next())?;
        let entries = match pair.next() {
            Some(entries) => parse_stream_entries(entries)?,
            None => return Err(RedisError::Protocol("truncated stream reply".to_string())),
        };
        keys.push(StreamKey { key, entries });
    }
    Ok(Some(keys))
}

fn parse_stream_entries(reply: Reply) -> Result<Vec<StreamEntry>> {
    let items = reply.into_array()?.unwrap_or_default();
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let mut pair = match item.into_array()? {
            Some(pair) => pair.into_iter(),
            None => return Err(RedisError::Protocol("null stream entry".to_string())),
        };
        let id = parse_string(pair.next())?;
        // Fields may be a null array for entries trimmed out from under a
        // pending list.
        let fields = match pair.next() {
            Some(fields) => fields.into_array()?.unwrap_or_default(),
            None => return Err(RedisError::Protocol("truncated stream entry".to_string())),
        };
        if fields.len() % 2 != 0 {
            return Err(RedisError::Protocol(
                "stream entry has odd field count".to_string(),
            ));
        }
        let mut pairs = Vec::with_capacity(fields.len() / 2);
        let mut iter = fields.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            pairs.push((parse_string(Some(field))?, expect_bulk(Some(value))?));
        }
        entries.push(StreamEntry { id, fields: pairs });
    }
    Ok(entries)
}
