//! In-memory connection pairs for protocol tests.

use tokio::io::{duplex, DuplexStream};

use crate::connection::Connection;
use crate::liveness::Liveness;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Two connected ends of an in-memory pipe sharing one liveness flag.
pub fn duplex_pair(liveness: &Liveness) -> (Connection<DuplexStream>, Connection<DuplexStream>) {
    let (a, b) = duplex(PIPE_CAPACITY);
    (
        Connection::new(a, None, liveness.clone()),
        Connection::new(b, None, liveness.clone()),
    )
}
