//! RESP (Redis Serialization Protocol) reply model and decoder.
//!
//! Request encoding lives with [`crate::cmd::Command`]; this module owns the
//! reply side: the [`Reply`] tagged union and the incremental [`decode`]
//! function the connection drives.

mod codec;
mod value;

pub use codec::decode;
pub use value::Reply;
