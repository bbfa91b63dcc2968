//! rat nameserver: peers register their identity and look each other up by
//! name.
//!
//! Every connection carries exactly one command after the handshake:
//! the literal `register`, or a regular expression matched against
//! registered names. The registry lives in memory only.

#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod server;
pub mod store;

pub use client::{ask, register, DirectoryError, Lookup};
pub use config::ServerConfig;
pub use server::NameServer;
pub use store::{Registry, StoreError};

/// Command payload that registers the handshaken identity.
pub const REGISTER: &[u8] = b"register";
/// Reply when a lookup pattern does not compile.
pub const INVALID_PATTERN: &[u8] = b"Invalid regular expression!";
/// Reply when a lookup matches no one.
pub const NO_MATCHES: &[u8] = b"No matches!";
