//! Nameserver connection handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::ToSocketAddrs;
use tracing::{debug, info};

use rat_core::handshake::as_server;
use rat_core::{LocalPeer, ProtocolError, Session};
use rat_transport::{Connection, Listener, TransportError};

use crate::config::ServerConfig;
use crate::store::Registry;
use crate::{INVALID_PATTERN, NO_MATCHES, REGISTER};

/// A running nameserver.
pub struct NameServer {
    listener: Listener,
    registry: Arc<Registry>,
}

impl NameServer {
    pub async fn bind<A>(
        addr: A,
        local: Arc<LocalPeer>,
        registry: Arc<Registry>,
    ) -> Result<Self, TransportError>
    where
        A: ToSocketAddrs + std::fmt::Debug,
    {
        let reg = Arc::clone(&registry);
        let listener = Listener::bind(addr, move |conn, _liveness| {
            let local = Arc::clone(&local);
            let reg = Arc::clone(&reg);
            async move { handle(conn, &local, &reg).await }
        })
        .await?;
        info!(addr = %listener.local_addr(), "nameserver up");
        Ok(Self { listener, registry })
    }

    /// Load keys per `config`, bind and serve until Ctrl-C.
    pub async fn run(config: ServerConfig) -> Result<()> {
        let store = config.peer.key_store();
        let keys = store
            .load_or_generate(config.peer.crypto.key_bits)
            .context("loading key pair")?;
        let local = Arc::new(config.peer.local_peer(keys));
        info!(fingerprint = %local.identity().fingerprint(), "nameserver key");

        let server = Self::bind(config.listen_addr, local, Arc::new(Registry::new())).await?;
        tokio::signal::ctrl_c().await?;
        info!("shutdown signal received");
        server.shutdown(Duration::from_secs(5)).await;
        Ok(())
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub async fn shutdown(self, grace: Duration) -> usize {
        self.listener.shutdown(grace).await
    }
}

/// One connection: handshake, one command, reply, close. Any failure just
/// drops the connection.
async fn handle<S>(conn: Connection<S>, local: &LocalPeer, registry: &Registry)
where
    S: AsyncRead + AsyncWrite,
{
    let peer_addr = conn.peer_addr();
    let mut session = match as_server(conn, local).await {
        Ok(s) => s,
        Err(e) => {
            debug!(peer = ?peer_addr, error = %e, "dropping connection");
            return;
        }
    };

    if let Err(e) = serve_command(&mut session, registry).await {
        debug!(peer = ?peer_addr, error = %e, "command failed");
    }
    let _ = session.close().await;
}

async fn serve_command<S>(session: &mut Session<S>, registry: &Registry) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite,
{
    let command = session.receive().await?;

    if command == REGISTER {
        let identity = session.peer().clone();
        info!(name = %identity.name, fingerprint = %identity.fingerprint(), "registered");
        registry.register(identity);
        info!(users = registry.len(), "registry size");
        return Ok(());
    }

    let pattern = match std::str::from_utf8(&command) {
        Ok(p) => p,
        Err(_) => return session.send(INVALID_PATTERN).await,
    };
    debug!(asker = %session.peer().name, %pattern, "lookup");

    let matches = match registry.ask(pattern) {
        Ok(m) => m,
        Err(_) => return session.send(INVALID_PATTERN).await,
    };
    if matches.is_empty() {
        return session.send(NO_MATCHES).await;
    }
    for identity in matches {
        session.send(&identity.encode()).await?;
    }
    Ok(())
}
