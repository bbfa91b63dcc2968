//! Error types for the rat protocol.
//!
//! Every failure here is scoped to one connection. Callers drop the
//! connection and carry on; nothing is retried at this layer.

use std::fmt;
use std::io;

use thiserror::Error;

use rat_crypto::CryptoError;
use rat_transport::TransportError;

use crate::handshake::HandshakeState;

/// Failure of a wire-level exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Trailing block did not verify against the sender's key. Fatal to
    /// the connection.
    #[error("signature verification failed")]
    Verification,

    /// The peer sent something that does not fit the protocol.
    #[error("protocol violation: {0}")]
    Violation(String),

    /// Stream ended before a complete message arrived.
    #[error("remote disconnected")]
    RemoteDisconnected,

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    pub fn violation(msg: impl fmt::Display) -> Self {
        Self::Violation(msg.to_string())
    }

    /// True when the peer simply went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::RemoteDisconnected => true,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

impl From<CryptoError> for ProtocolError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Verification => Self::Verification,
            other => Self::Crypto(other),
        }
    }
}

/// A handshake aborted in `state`. The connection must be dropped.
#[derive(Debug, Error)]
#[error("handshake failed during {state}: {source}")]
pub struct HandshakeError {
    pub state: HandshakeState,
    #[source]
    pub source: ProtocolError,
}

impl HandshakeError {
    pub fn new(state: HandshakeState, source: impl Into<ProtocolError>) -> Self {
        Self {
            state,
            source: source.into(),
        }
    }
}

/// Failure to open a session to a remote peer.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connect failed: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}
