//! One established stream plus the flag that governs it.

use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::TransportError;
use crate::liveness::Liveness;
use crate::reader::ChunkReader;

/// An accepted or dialed stream, not yet split into halves.
///
/// Generic over the stream so tests can run the protocol over in-memory
/// pipes; production code uses the `TcpStream` default.
pub struct Connection<S = TcpStream> {
    stream: S,
    peer: Option<SocketAddr>,
    liveness: Liveness,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S, peer: Option<SocketAddr>, liveness: Liveness) -> Self {
        Self {
            stream,
            peer,
            liveness,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Split into a block reader of `chunk_bytes` and the raw write half.
    pub fn split(self, chunk_bytes: usize) -> (ChunkReader<ReadHalf<S>>, WriteHalf<S>) {
        let (r, w) = split(self.stream);
        (ChunkReader::new(r, chunk_bytes, self.liveness), w)
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn prepare(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "set_nodelay failed");
    }
}

pub(crate) fn from_tcp(stream: TcpStream, peer: SocketAddr, liveness: Liveness) -> Connection {
    prepare(&stream);
    Connection::new(stream, Some(peer), liveness)
}

/// Open a TCP connection.
pub async fn connect<A: ToSocketAddrs>(
    addr: A,
    liveness: Liveness,
) -> Result<Connection, TransportError> {
    let stream = TcpStream::connect(addr).await?;
    let peer = stream.peer_addr()?;
    Ok(from_tcp(stream, peer, liveness))
}

/// Open a TCP connection, run `handler` on it and return its result once it
/// finishes. The stream is closed when the handler drops it.
pub async fn dial<A, F, Fut, T>(addr: A, liveness: Liveness, handler: F) -> Result<T, TransportError>
where
    A: ToSocketAddrs,
    F: FnOnce(Connection) -> Fut,
    Fut: Future<Output = T>,
{
    let conn = connect(addr, liveness).await?;
    Ok(handler(conn).await)
}
