//! Chat listener: every verified message lands in the shared mailbox.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::ToSocketAddrs;
use tracing::{debug, info, warn};

use rat_transport::{Connection, Liveness, Listener, TransportError};

use crate::handshake::{as_server, LocalPeer};
use crate::mailbox::Mailbox;

pub struct ChatServer {
    listener: Listener,
    mailbox: Arc<Mailbox>,
}

impl ChatServer {
    pub async fn bind<A>(
        addr: A,
        local: Arc<LocalPeer>,
        mailbox: Arc<Mailbox>,
    ) -> Result<Self, TransportError>
    where
        A: ToSocketAddrs + std::fmt::Debug,
    {
        let sink = Arc::clone(&mailbox);
        let listener = Listener::bind(addr, move |conn, liveness| {
            let local = Arc::clone(&local);
            let sink = Arc::clone(&sink);
            async move { handle(conn, liveness, &local, &sink).await }
        })
        .await?;
        Ok(Self { listener, mailbox })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    pub async fn stop(&mut self) {
        self.listener.stop().await;
    }

    pub async fn shutdown(self, grace: Duration) -> usize {
        self.listener.shutdown(grace).await
    }
}

async fn handle<S>(conn: Connection<S>, liveness: Liveness, local: &LocalPeer, mailbox: &Mailbox)
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
    let name = session.peer().name.clone();
    info!(peer = ?peer_addr, %name, "chat peer connected");

    while liveness.is_alive() {
        match session.receive().await {
            Ok(msg) => {
                debug!(%name, bytes = msg.len(), "message");
                mailbox.publish(msg);
            }
            Err(e) if e.is_disconnect() => break,
            Err(e) => {
                warn!(%name, error = %e, "dropping chat peer");
                break;
            }
        }
    }
    info!(peer = ?peer_addr, %name, "chat peer gone");
}
