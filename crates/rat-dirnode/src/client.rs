//! Client side of the two nameserver verbs.

use thiserror::Error;
use tokio::net::ToSocketAddrs;

use rat_core::{connect, ConnectError, Identity, LocalPeer, ProtocolError};
use rat_transport::Liveness;

use crate::{INVALID_PATTERN, NO_MATCHES, REGISTER};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Vec<Identity>),
    NoMatches,
    InvalidPattern,
}

/// Publish our identity. Returns once the server has closed the
/// connection, i.e. after it processed the command.
pub async fn register<A>(addr: A, local: &LocalPeer, liveness: Liveness) -> Result<(), DirectoryError>
where
    A: ToSocketAddrs,
{
    let mut session = connect(addr, local, liveness).await?;
    session.send(REGISTER).await?;
    match session.receive().await {
        Ok(_) => Err(ProtocolError::violation("unexpected reply to register").into()),
        Err(e) if e.is_disconnect() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Look up peers whose name matches `pattern` from its first character.
pub async fn ask<A>(
    addr: A,
    local: &LocalPeer,
    pattern: &str,
    liveness: Liveness,
) -> Result<Lookup, DirectoryError>
where
    A: ToSocketAddrs,
{
    let mut session = connect(addr, local, liveness).await?;
    session.send(pattern.as_bytes()).await?;

    let mut replies = Vec::new();
    loop {
        match session.receive().await {
            Ok(reply) => replies.push(reply),
            Err(e) if e.is_disconnect() => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(interpret(replies)?)
}

fn interpret(replies: Vec<Vec<u8>>) -> Result<Lookup, ProtocolError> {
    match replies.as_slice() {
        [only] if only.as_slice() == NO_MATCHES => return Ok(Lookup::NoMatches),
        [only] if only.as_slice() == INVALID_PATTERN => return Ok(Lookup::InvalidPattern),
        _ => {}
    }
    let found = replies
        .iter()
        .map(|r| Identity::decode(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Lookup::Found(found))
}
