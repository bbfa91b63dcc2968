//! A handshaken connection bound to one verified peer.

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use rat_crypto::{KeyPair, VerifyingKey};
use rat_transport::{self as transport, ChunkReader, Liveness};

use crate::errors::{ConnectError, ProtocolError};
use crate::handshake::{self, LocalPeer};
use crate::identity::Identity;
use crate::wire;

/// Both halves of a session. Messages go to and come from `peer` only.
pub struct Session<S = TcpStream> {
    reader: SessionReader<S>,
    writer: SessionWriter<S>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub(crate) fn new(
        reader: ChunkReader<ReadHalf<S>>,
        writer: WriteHalf<S>,
        keys: Arc<KeyPair>,
        peer: Identity,
    ) -> Self {
        Self {
            writer: SessionWriter {
                writer,
                keys: Arc::clone(&keys),
                peer_key: peer.verifying_key.clone(),
            },
            reader: SessionReader { reader, keys, peer },
        }
    }

    pub fn peer(&self) -> &Identity {
        &self.reader.peer
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        self.writer.send(payload).await
    }

    /// Block until one whole message arrives from the peer.
    pub async fn receive(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.reader.receive().await
    }

    /// Close our sending side.
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        self.writer.close().await
    }

    pub fn into_parts(self) -> (SessionReader<S>, SessionWriter<S>) {
        (self.reader, self.writer)
    }
}

/// Receiving half of a [`Session`].
pub struct SessionReader<S = TcpStream> {
    reader: ChunkReader<ReadHalf<S>>,
    keys: Arc<KeyPair>,
    peer: Identity,
}

impl<S> SessionReader<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn peer(&self) -> &Identity {
        &self.peer
    }

    pub fn liveness(&self) -> &Liveness {
        self.reader.liveness()
    }

    pub async fn receive(&mut self) -> Result<Vec<u8>, ProtocolError> {
        wire::receive(&mut self.reader, self.keys.signing(), &self.peer.verifying_key).await
    }
}

/// Sending half of a [`Session`].
pub struct SessionWriter<S = TcpStream> {
    writer: WriteHalf<S>,
    keys: Arc<KeyPair>,
    peer_key: VerifyingKey,
}

impl<S> SessionWriter<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn peer_key(&self) -> &VerifyingKey {
        &self.peer_key
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        wire::send(&mut self.writer, payload, self.keys.signing(), &self.peer_key).await
    }

    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

// Keys stay out of debug output; the peer is enough to tell sessions apart.
impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.reader.peer)
            .finish_non_exhaustive()
    }
}

impl<S> fmt::Debug for SessionReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionReader")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

impl<S> fmt::Debug for SessionWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionWriter")
            .field("peer_key", &self.peer_key)
            .finish_non_exhaustive()
    }
}

/// Dial `addr` and run the client handshake.
pub async fn connect<A>(
    addr: A,
    local: &LocalPeer,
    liveness: Liveness,
) -> Result<Session, ConnectError>
where
    A: ToSocketAddrs,
{
    let conn = transport::connect(addr, liveness).await?;
    Ok(handshake::as_client(conn, local).await?)
}

#[cfg(test)]
mod tests {
    use crate::harness::{handshaken_pair, local_peer};
    use rat_crypto::testing;

    #[tokio::test]
    async fn test_conversation_both_ways() {
        let alice = local_peer("alice", testing::alice(), "pepper");
        let bob = local_peer("bob", testing::bob(), "pepper");
        let (mut a, mut b) = handshaken_pair(&alice, &bob).await;

        a.send(b"hello").await.unwrap();
        assert_eq!(b.receive().await.unwrap(), b"hello");
        b.send(b"world").await.unwrap();
        assert_eq!(a.receive().await.unwrap(), b"world");
    }

    #[tokio::test]
    async fn test_split_halves_work_independently() {
        let alice = local_peer("alice", testing::alice(), "pepper");
        let bob = local_peer("bob", testing::bob(), "pepper");
        let (a, mut b) = handshaken_pair(&alice, &bob).await;

        let (mut reader, mut writer) = a.into_parts();
        assert_eq!(reader.peer().name, "bob");
        assert_eq!(writer.peer_key(), &testing::bob().verifying().clone());

        let echo = tokio::spawn(async move {
            let msg = b.receive().await.unwrap();
            b.send(&msg).await.unwrap();
            b
        });
        writer.send(b"ping").await.unwrap();
        assert_eq!(reader.receive().await.unwrap(), b"ping");
        echo.await.unwrap();
    }

    #[tokio::test]
    async fn test_debug_shows_peer_not_keys() {
        let alice = local_peer("alice", testing::alice(), "pepper");
        let bob = local_peer("bob", testing::bob(), "pepper");
        let (a, _b) = handshaken_pair(&alice, &bob).await;

        let shown = format!("{a:?}");
        assert!(shown.starts_with("Session {"));
        assert!(shown.contains("\"bob\""));
        assert!(!shown.contains("SigningKey"));

        let (reader, writer) = a.into_parts();
        assert!(format!("{reader:?}").starts_with("SessionReader { peer: Identity {"));
        assert!(format!("{writer:?}").starts_with("SessionWriter { peer_key: VerifyingKey("));
    }

    #[tokio::test]
    async fn test_close_ends_peer_receive() {
        let alice = local_peer("alice", testing::alice(), "pepper");
        let bob = local_peer("bob", testing::bob(), "pepper");
        let (mut a, mut b) = handshaken_pair(&alice, &bob).await;

        a.close().await.unwrap();
        assert!(b.receive().await.unwrap_err().is_disconnect());
    }
}
