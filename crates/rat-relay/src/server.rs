//! Relay server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::ToSocketAddrs;
use tracing::{debug, info, warn};

use rat_core::handshake::as_server;
use rat_core::LocalPeer;
use rat_transport::{Connection, Liveness, Listener, TransportError};

use crate::config::ServerConfig;
use crate::forwarder::PeerSet;

pub struct RelayServer {
    listener: Listener,
    peers: Arc<PeerSet>,
}

impl RelayServer {
    pub async fn bind<A>(addr: A, local: Arc<LocalPeer>) -> Result<Self, TransportError>
    where
        A: ToSocketAddrs + std::fmt::Debug,
    {
        let peers = PeerSet::new();
        let set = Arc::clone(&peers);
        let listener = Listener::bind(addr, move |conn, liveness| {
            let local = Arc::clone(&local);
            let set = Arc::clone(&set);
            async move { handle(conn, liveness, &local, &set).await }
        })
        .await?;
        info!(addr = %listener.local_addr(), "relay up");
        Ok(Self { listener, peers })
    }

    /// Load keys per `config`, bind and serve until Ctrl-C.
    pub async fn run(config: ServerConfig) -> Result<()> {
        let keys = config
            .peer
            .key_store()
            .load_or_generate(config.peer.crypto.key_bits)
            .context("loading key pair")?;
        let local = Arc::new(config.peer.local_peer(keys));
        info!(fingerprint = %local.identity().fingerprint(), "relay key");

        let server = Self::bind(config.listen_addr, local).await?;
        tokio::signal::ctrl_c().await?;
        info!("shutdown signal received");
        server.shutdown(Duration::from_secs(5)).await;
        Ok(())
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn peers(&self) -> &Arc<PeerSet> {
        &self.peers
    }

    pub async fn shutdown(self, grace: Duration) -> usize {
        self.listener.shutdown(grace).await
    }
}

async fn handle(conn: Connection, liveness: Liveness, local: &LocalPeer, peers: &Arc<PeerSet>) {
    let peer_addr = conn.peer_addr();
    let session = match as_server(conn, local).await {
        Ok(s) => s,
        Err(e) => {
            debug!(peer = ?peer_addr, error = %e, "dropping connection");
            return;
        }
    };

    let name = session.peer().name.clone();
    let (mut reader, writer) = session.into_parts();
    let membership = peers.join(name.clone(), writer);
    info!(peer = ?peer_addr, %name, id = membership.id(), connected = peers.len(), "relay peer joined");

    while liveness.is_alive() {
        match reader.receive().await {
            Ok(msg) => {
                peers.broadcast(membership.id(), &msg).await;
            }
            Err(e) if e.is_disconnect() => break,
            Err(e) => {
                warn!(%name, error = %e, "dropping relay peer");
                break;
            }
        }
    }

    drop(membership);
    info!(peer = ?peer_addr, %name, connected = peers.len(), "relay peer left");
}
