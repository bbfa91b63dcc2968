//! rat core - the protocol spoken between peers.
//!
//! This crate implements:
//! - Wire messages (encrypt, sign, frame by decryption failure)
//! - The pepper / public key / identity handshake
//! - Sessions bound to a verified peer identity
//! - The broadcast mailbox consumed by bot threads
//! - The chat listener and peer configuration

#![forbid(unsafe_code)]

// Protocol
pub mod wire;
pub mod handshake;
pub mod session;
pub mod chat;

// Supporting modules
pub mod errors;
pub mod identity;
pub mod mailbox;
pub mod config;
pub mod harness;

#[cfg(test)]
mod proptests;

pub use errors::{ConnectError, HandshakeError, ProtocolError};
pub use handshake::{HandshakeState, LocalPeer};
pub use identity::Identity;
pub use mailbox::{Mailbox, Watcher};
pub use session::{connect, Session, SessionReader, SessionWriter};
