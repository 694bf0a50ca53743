//! Redwire - async client for the Redis wire protocol
//!
//! One [`Client`] owns one connection. Commands are pipelined over it with
//! strict FIFO reply correlation, so concurrent callers, pipelines, and
//! MULTI/EXEC transactions all share the connection safely.
//!
//! # Example
//!
//! ```no_run
//! use redwire::{Client, ConnectOptions};
//!
//! # async fn example() -> redwire::Result<()> {
//! let client = Client::connect(ConnectOptions::new("127.0.0.1", 6379)).await?;
//!
//! client.set("key", "value").await?;
//! let value = client.get("key").await?;
//! assert_eq!(value.as_deref(), Some(&b"value"[..]));
//!
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod cmd;
pub mod config;
pub mod connection;
mod dispatcher;
pub mod error;
pub mod resp;
pub mod types;

pub use batch::{Pipeline, Transaction};
pub use client::Client;
pub use cmd::Command;
pub use config::ConnectOptions;
pub use connection::{Connection, ConnectionState};
pub use error::{RedisError, Result};
pub use resp::Reply;
pub use types::{GeoMember, GeoUnit, StreamEntry, StreamKey, XReadOptions, ZMember};
