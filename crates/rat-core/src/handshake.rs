//! Mutual introduction of two peers.
//!
//! ```text
//! client                                server
//!   | -- pepper (cleartext) ------------> |  PepperCheck: mismatch => silent drop
//!   | <------------ public key (DER) ---- |  PubkeyExchange
//!   | -- identity (sealed to server) ---> |  IdentityExchange
//!   | <------ identity (sealed to client) |
//! ```
//!
//! Each identity is verified against the key embedded in it. That proves
//! the sender holds the matching private key and nothing more: whether the
//! key belongs to who the peer claims is left to an out-of-band
//! fingerprint comparison.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use rat_crypto::utils::constant_time_compare;
use rat_crypto::{verify, KeyPair, VerifyingKey};
use rat_proto::validation::sizes::MAX_KEY_SIZE;
use rat_transport::{ChunkReader, Connection};

use crate::errors::{HandshakeError, ProtocolError};
use crate::identity::Identity;
use crate::session::Session;
use crate::wire;

/// How long a client has to deliver the whole pepper.
pub const PEPPER_WINDOW: Duration = Duration::from_secs(2);

/// Handshake progress. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandshakeState {
    PepperCheck,
    PubkeyExchange,
    IdentityExchange,
    Done,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PepperCheck => "pepper check",
            Self::PubkeyExchange => "public key exchange",
            Self::IdentityExchange => "identity exchange",
            Self::Done => "done",
        })
    }
}

/// What this process brings to every handshake.
#[derive(Debug)]
pub struct LocalPeer {
    keys: Arc<KeyPair>,
    identity: Identity,
    pepper: Vec<u8>,
}

impl LocalPeer {
    /// The identity's key is always the key pair's verifying key; whatever
    /// key `identity` carried is replaced.
    pub fn new(keys: Arc<KeyPair>, identity: Identity, pepper: impl Into<Vec<u8>>) -> Self {
        let identity = Identity {
            verifying_key: keys.verifying().clone(),
            ..identity
        };
        Self {
            keys,
            identity,
            pepper: pepper.into(),
        }
    }

    pub fn keys(&self) -> &Arc<KeyPair> {
        &self.keys
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn pepper(&self) -> &[u8] {
        &self.pepper
    }
}

struct Progress {
    state: HandshakeState,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: HandshakeState::PepperCheck,
        }
    }

    fn advance(&mut self, next: HandshakeState) {
        debug_assert!(next > self.state);
        self.state = next;
    }

    fn fail(&self, e: impl Into<ProtocolError>) -> HandshakeError {
        HandshakeError::new(self.state, e)
    }
}

/// Run the server side. A wrong pepper aborts without sending a byte.
pub async fn as_server<S>(conn: Connection<S>, local: &LocalPeer) -> Result<Session<S>, HandshakeError>
where
    S: AsyncRead + AsyncWrite,
{
    let peer_addr = conn.peer_addr();
    let own = Arc::clone(&local.keys);
    let (mut reader, mut writer) = conn.split(own.chunk_bytes());
    let mut p = Progress::new();

    if let Err(e) = read_pepper(&mut reader, &local.pepper).await {
        debug!(peer = ?peer_addr, error = %e, "wrong pepper, dropping");
        return Err(p.fail(e));
    }

    p.advance(HandshakeState::PubkeyExchange);
    writer
        .write_all(own.verifying().as_der())
        .await
        .map_err(|e| p.fail(e))?;
    writer.flush().await.map_err(|e| p.fail(e))?;

    p.advance(HandshakeState::IdentityExchange);
    let peer = read_identity(&mut reader, &own, None)
        .await
        .map_err(|e| p.fail(e))?;
    wire::send(&mut writer, &local.identity.encode(), own.signing(), &peer.verifying_key)
        .await
        .map_err(|e| p.fail(e))?;

    p.advance(HandshakeState::Done);
    debug!(peer = ?peer_addr, name = %peer.name, fingerprint = %peer.fingerprint(), "handshake complete (server)");
    Ok(Session::new(reader, writer, own, peer))
}

/// Run the client side.
pub async fn as_client<S>(conn: Connection<S>, local: &LocalPeer) -> Result<Session<S>, HandshakeError>
where
    S: AsyncRead + AsyncWrite,
{
    let peer_addr = conn.peer_addr();
    let own = Arc::clone(&local.keys);
    let (mut reader, mut writer) = conn.split(own.chunk_bytes());
    let mut p = Progress::new();

    writer.write_all(&local.pepper).await.map_err(|e| p.fail(e))?;
    writer.flush().await.map_err(|e| p.fail(e))?;

    p.advance(HandshakeState::PubkeyExchange);
    let der = read_der(&mut reader).await.map_err(|e| p.fail(e))?;
    let server_key = VerifyingKey::from_der(&der).map_err(|e| p.fail(e))?;
    check_key_size(&own, &server_key).map_err(|e| p.fail(e))?;

    p.advance(HandshakeState::IdentityExchange);
    wire::send(&mut writer, &local.identity.encode(), own.signing(), &server_key)
        .await
        .map_err(|e| p.fail(e))?;
    let peer = read_identity(&mut reader, &own, Some(&server_key))
        .await
        .map_err(|e| p.fail(e))?;

    p.advance(HandshakeState::Done);
    debug!(peer = ?peer_addr, name = %peer.name, fingerprint = %peer.fingerprint(), "handshake complete (client)");
    Ok(Session::new(reader, writer, own, peer))
}

/// Accept the pepper only if it arrives whole within [`PEPPER_WINDOW`].
/// Bytes that already diverge from it fail at once.
async fn read_pepper<R>(reader: &mut ChunkReader<R>, pepper: &[u8]) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + PEPPER_WINDOW;
    let mut offered = Vec::with_capacity(pepper.len());
    while offered.len() < pepper.len() {
        let wanted = pepper.len() - offered.len();
        let piece = match timeout_at(deadline, reader.read_up_to(wanted)).await {
            Ok(read) => read?.ok_or(ProtocolError::RemoteDisconnected)?,
            Err(_elapsed) => return Err(ProtocolError::violation("pepper incomplete")),
        };
        offered.extend_from_slice(&piece);
        if !constant_time_compare(&offered, &pepper[..offered.len()]) {
            return Err(ProtocolError::violation("pepper mismatch"));
        }
    }
    Ok(())
}

fn check_key_size(own: &KeyPair, peer: &VerifyingKey) -> Result<(), ProtocolError> {
    if own.chunk_bytes() != peer.chunk_bytes() {
        return Err(ProtocolError::violation(format_args!(
            "peer key is {} bytes, ours is {}",
            peer.chunk_bytes(),
            own.chunk_bytes()
        )));
    }
    Ok(())
}

/// Receive a sealed identity and verify it against its own embedded key.
/// With `announced`, the embedded key must also match the key the peer sent
/// in cleartext.
async fn read_identity<R>(
    reader: &mut ChunkReader<R>,
    own: &KeyPair,
    announced: Option<&VerifyingKey>,
) -> Result<Identity, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let (plain, signature) = wire::read_sealed(reader, own.signing()).await?;
    let peer = Identity::decode(&plain)?;
    if let Some(key) = announced {
        if key != &peer.verifying_key {
            return Err(ProtocolError::violation("identity key differs from announced key"));
        }
    }
    check_key_size(own, &peer.verifying_key)?;
    verify(&plain, &signature, &peer.verifying_key)?;
    Ok(peer)
}

/// Read one DER SEQUENCE off the stream. DER carries its own length, so the
/// cleartext key needs no framing.
async fn read_der<R>(reader: &mut ChunkReader<R>) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let header = reader
        .read_exact_raw(2)
        .await?
        .ok_or(ProtocolError::RemoteDisconnected)?;
    if header[0] != 0x30 {
        return Err(ProtocolError::violation("public key is not a DER sequence"));
    }

    let mut der = header.to_vec();
    let body_len = match header[1] {
        short @ 0..=0x7f => short as usize,
        0x81 | 0x82 => {
            let n = (header[1] & 0x7f) as usize;
            let len_bytes = reader
                .read_exact_raw(n)
                .await?
                .ok_or(ProtocolError::RemoteDisconnected)?;
            der.extend_from_slice(&len_bytes);
            len_bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize)
        }
        _ => return Err(ProtocolError::violation("public key length out of range")),
    };
    if der.len() + body_len > MAX_KEY_SIZE {
        return Err(ProtocolError::violation("public key too large"));
    }

    let body = reader
        .read_exact_raw(body_len)
        .await?
        .ok_or(ProtocolError::RemoteDisconnected)?;
    der.extend_from_slice(&body);
    Ok(der)
}
