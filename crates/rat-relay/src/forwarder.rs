//! Fan-out of one peer's message to all other peers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use rat_core::SessionWriter;

/// Per-connection id. Keys are not unique enough: one key may be connected
/// twice.
pub type PeerId = u64;

struct RelayPeer<S> {
    name: String,
    writer: Arc<Mutex<SessionWriter<S>>>,
}

/// Currently connected, handshaken peers.
pub struct PeerSet<S = TcpStream> {
    peers: DashMap<PeerId, RelayPeer<S>>,
    next_id: AtomicU64,
}

impl<S> Default for PeerSet<S> {
    fn default() -> Self {
        Self {
            peers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<S> PeerSet<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a peer. It stays in the set until the returned guard is dropped.
    pub fn join(self: &Arc<Self>, name: impl Into<String>, writer: SessionWriter<S>) -> Membership<S> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.peers.insert(
            id,
            RelayPeer {
                name: name.into(),
                writer: Arc::new(Mutex::new(writer)),
            },
        );
        Membership {
            set: Arc::clone(self),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Send `payload` to every peer except `from`, sealed to each
    /// recipient's key and signed by the relay. A failed send is logged and
    /// skipped. Returns how many peers it reached.
    pub async fn broadcast(&self, from: PeerId, payload: &[u8]) -> usize {
        // Snapshot first so no map guard is held across an await.
        let targets: Vec<(PeerId, String, Arc<Mutex<SessionWriter<S>>>)> = self
            .peers
            .iter()
            .filter(|e| *e.key() != from)
            .map(|e| (*e.key(), e.value().name.clone(), Arc::clone(&e.value().writer)))
            .collect();

        let mut delivered = 0;
        for (id, name, writer) in targets {
            match writer.lock().await.send(payload).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(peer = id, %name, error = %e, "forward failed"),
            }
        }
        debug!(from, delivered, bytes = payload.len(), "broadcast");
        delivered
    }
}

/// Removes its peer from the set when dropped.
pub struct Membership<S = TcpStream> {
    set: Arc<PeerSet<S>>,
    id: PeerId,
}

impl<S> Membership<S> {
    pub fn id(&self) -> PeerId {
        self.id
    }
}

impl<S> Drop for Membership<S> {
    fn drop(&mut self) {
        self.set.peers.remove(&self.id);
    }
}
