//! rat relay: a hub that re-encrypts every message it receives to each of
//! the other connected peers.
//!
//! Recipients verify the relay's signature, not the original author's, so
//! provenance is relay-level only.

#![forbid(unsafe_code)]

pub mod config;
pub mod forwarder;
pub mod server;

pub use config::ServerConfig;
pub use forwarder::{Membership, PeerId, PeerSet};
pub use server::RelayServer;
