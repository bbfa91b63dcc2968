//! Latest-message cell shared between the chat handler and bot threads.
//!
//! One producer overwrites the slot and wakes everyone; any number of
//! consumers wait for the next publication and then read the slot without
//! taking it, so every watcher sees the same message. Bots run on plain OS
//! threads, so waiting blocks the calling thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct Slot {
    generation: u64,
    latest: Option<Bytes>,
    closed: bool,
}

#[derive(Default)]
pub struct Mailbox {
    slot: Mutex<Slot>,
    published: Condvar,
}

impl Mailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the slot and wake every waiter.
    pub fn publish(&self, msg: impl Into<Bytes>) {
        let mut slot = self.slot.lock();
        if slot.closed {
            return;
        }
        slot.generation += 1;
        slot.latest = Some(msg.into());
        self.published.notify_all();
    }

    /// Current contents, without waiting.
    pub fn peek(&self) -> Option<Bytes> {
        self.slot.lock().latest.clone()
    }

    /// Block until the next publication and return it. `None` once the
    /// mailbox is closed.
    pub fn wait_and_peek(&self) -> Option<Bytes> {
        let mut slot = self.slot.lock();
        let seen = slot.generation;
        while slot.generation == seen && !slot.closed {
            self.published.wait(&mut slot);
        }
        if slot.closed {
            return None;
        }
        slot.latest.clone()
    }

    /// Wake all waiters with `None` and ignore later publications.
    pub fn close(&self) {
        self.slot.lock().closed = true;
        self.published.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    /// A cursor that remembers what it has already seen.
    pub fn watch(self: &Arc<Self>) -> Watcher {
        let seen = self.slot.lock().generation;
        Watcher {
            mailbox: Arc::clone(self),
            seen,
        }
    }
}

/// Per-consumer view of a [`Mailbox`].
///
/// Unlike [`Mailbox::wait_and_peek`], a watcher does not miss a message
/// published while it was busy: it returns immediately if anything newer
/// than its last read is in the slot. Intermediate messages are skipped;
/// only the latest is kept.
pub struct Watcher {
    mailbox: Arc<Mailbox>,
    seen: u64,
}

impl Watcher {
    pub fn wait_and_peek(&mut self) -> Option<Bytes> {
        self.wait_inner(None)
    }

    /// As [`wait_and_peek`](Self::wait_and_peek), giving up after `timeout`.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Bytes> {
        self.wait_inner(Some(timeout))
    }

    fn wait_inner(&mut self, timeout: Option<Duration>) -> Option<Bytes> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mb = &self.mailbox;
        let mut slot = mb.slot.lock();
        while slot.generation == self.seen && !slot.closed {
            match deadline {
                Some(at) => {
                    if mb.published.wait_until(&mut slot, at).timed_out() {
                        return None;
                    }
                }
                None => mb.published.wait(&mut slot),
            }
        }
        if slot.closed {
            return None;
        }
        self.seen = slot.generation;
        slot.latest.clone()
    }
}
