//! Stream plumbing for rat.
//!
//! A [`Listener`] runs an accept loop and hands every connection to its own
//! task; [`dial`] opens one outbound connection. Both share a [`Liveness`]
//! flag that polling loops check at least once per [`POLL_INTERVAL`], which
//! is the only way they are cancelled. [`ChunkReader`] turns an arbitrary
//! byte stream into the fixed-size blocks the wire format is made of.

#![forbid(unsafe_code)]

pub mod connection;
pub mod error;
pub mod listener;
pub mod liveness;
pub mod reader;
pub mod testing;

pub use connection::{connect, dial, Connection};
pub use error::TransportError;
pub use listener::Listener;
pub use liveness::{Liveness, POLL_INTERVAL};
pub use reader::ChunkReader;
