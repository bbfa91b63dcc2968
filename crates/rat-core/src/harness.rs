//! Test harness for rat core functionality.
//!
//! Helpers to build local peers from fixture keys and to run a handshake
//! over an in-memory pipe, shared by unit tests here and by the directory
//! and relay crates.

use std::sync::Arc;

use tokio::io::DuplexStream;

use rat_crypto::{testing, KeyPair};
use rat_transport::testing::duplex_pair;
use rat_transport::Liveness;

use crate::handshake::{as_client, as_server, LocalPeer};
use crate::identity::Identity;
use crate::session::Session;

/// Pepper used by every harness peer.
pub const TEST_PEPPER: &str = "pepper";

pub fn local_peer(name: &str, keys: Arc<KeyPair>, pepper: &str) -> LocalPeer {
    let identity = Identity::new(name, keys.verifying().clone())
        .with_group("test")
        .with_address("127.0.0.1")
        .with_status(format!("{name} is testing"));
    LocalPeer::new(keys, identity, pepper)
}

/// The peer a directory or relay runs as in tests.
pub fn server_peer() -> LocalPeer {
    local_peer("server", testing::server(), TEST_PEPPER)
}

/// Handshake `client` against `server` over an in-memory pipe.
///
/// # Panics
///
/// Panics if either side of the handshake fails.
pub async fn handshaken_pair(
    client: &LocalPeer,
    server: &LocalPeer,
) -> (Session<DuplexStream>, Session<DuplexStream>) {
    let liveness = Liveness::new();
    let (a, b) = duplex_pair(&liveness);
    let (c, s) = tokio::join!(as_client(a, client), as_server(b, server));
    (c.expect("client handshake"), s.expect("server handshake"))
}
