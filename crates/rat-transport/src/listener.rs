//! Accept loop with per-connection tasks.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::connection::{from_tcp, Connection};
use crate::error::TransportError;
use crate::liveness::{Liveness, POLL_INTERVAL};

/// A bound TCP listener whose accept loop runs on its own task.
///
/// Every accepted connection is passed to the handler on a fresh task,
/// together with the session flag its reader also watches. That flag is
/// separate from the accept loop's own: stopping the listener ends the
/// accept loop but leaves accepted sessions running. A stopped listener
/// may still have connections finishing their work. Use
/// [`shutdown`](Self::shutdown) to wait for them.
pub struct Listener {
    local_addr: SocketAddr,
    liveness: Liveness,
    sessions: Liveness,
    stopped: Option<oneshot::Receiver<()>>,
    drain: Option<oneshot::Sender<Duration>>,
    task: Option<JoinHandle<usize>>,
}

impl Listener {
    pub async fn bind<A, F, Fut>(addr: A, handler: F) -> Result<Self, TransportError>
    where
        A: ToSocketAddrs + std::fmt::Debug,
        F: Fn(Connection, Liveness) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let socket = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: format!("{addr:?}"),
                source,
            })?;
        let local_addr = socket.local_addr()?;
        let liveness = Liveness::new();
        let sessions = Liveness::new();
        let (stopped_tx, stopped_rx) = oneshot::channel();
        let (drain_tx, drain_rx) = oneshot::channel();

        info!(%local_addr, "listening");
        let task = tokio::spawn(accept_loop(
            socket,
            Arc::new(handler),
            liveness.clone(),
            sessions.clone(),
            stopped_tx,
            drain_rx,
        ));

        Ok(Self {
            local_addr,
            liveness,
            sessions,
            stopped: Some(stopped_rx),
            drain: Some(drain_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The accept loop's flag.
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// The flag handed to every accepted connection. Only cleared by
    /// [`shutdown`](Self::shutdown) once its grace period runs out.
    pub fn sessions(&self) -> Liveness {
        self.sessions.clone()
    }

    pub fn is_running(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Clear the flag and wait for the accept loop to exit, which takes at
    /// most one [`POLL_INTERVAL`]. Handlers keep running.
    pub async fn stop(&mut self) {
        self.liveness.stop();
        if let Some(rx) = self.stopped.take() {
            let _ = rx.await;
        }
    }

    /// Stop, then wait up to `grace` for in-flight handlers. After that the
    /// session flag is cleared, which ends handlers blocked in a read within
    /// one [`POLL_INTERVAL`]; any still running past that are detached.
    /// Returns how many were detached.
    pub async fn shutdown(mut self, grace: Duration) -> usize {
        self.stop().await;
        if let Some(tx) = self.drain.take() {
            let _ = tx.send(grace);
        }
        match self.task.take() {
            Some(task) => task.await.unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        // The accept loop sees the flag and detaches its handlers once the
        // drain sender is gone. Sessions are left alone.
        self.liveness.stop();
    }
}

async fn accept_loop<F, Fut>(
    socket: TcpListener,
    handler: Arc<F>,
    liveness: Liveness,
    sessions: Liveness,
    stopped: oneshot::Sender<()>,
    drain: oneshot::Receiver<Duration>,
) -> usize
where
    F: Fn(Connection, Liveness) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut handlers = JoinSet::new();

    while liveness.is_alive() {
        tokio::select! {
            accepted = timeout(POLL_INTERVAL, socket.accept()) => match accepted {
                Err(_elapsed) => continue,
                Ok(Ok((stream, peer))) => {
                    debug!(%peer, "accepted");
                    let conn = from_tcp(stream, peer, sessions.clone());
                    handlers.spawn(handler(conn, sessions.clone()));
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            },
            Some(done) = handlers.join_next(), if !handlers.is_empty() => {
                if let Err(e) = done {
                    if e.is_panic() {
                        warn!("connection handler panicked");
                    }
                }
            }
        }
    }

    drop(socket);
    info!(in_flight = handlers.len(), "accept loop stopped");
    let _ = stopped.send(());

    if let Ok(grace) = drain.await {
        if !drain_handlers(&mut handlers, grace).await {
            warn!(remaining = handlers.len(), "handlers still running after grace period");
            sessions.stop();
            drain_handlers(&mut handlers, POLL_INTERVAL * 2).await;
        }
    }

    let remaining = handlers.len();
    handlers.detach_all();
    remaining
}

/// Join handlers for up to `limit`. `true` if all of them finished.
async fn drain_handlers(handlers: &mut JoinSet<()>, limit: Duration) -> bool {
    timeout(limit, async {
        while handlers.join_next().await.is_some() {}
    })
    .await
    .is_ok()
}
