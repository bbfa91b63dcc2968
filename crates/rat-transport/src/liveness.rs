use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a read or accept may block before the loop re-checks its
/// [`Liveness`]. Bounds cancellation latency.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared run flag for cooperative cancellation.
///
/// Starts alive. Any clone may [`stop`](Self::stop) it; once stopped it
/// stays stopped.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
