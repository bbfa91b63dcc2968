//! Key fixtures for tests in this and downstream crates.
//!
//! RSA generation is slow, so each named pair is generated once per test
//! binary and shared.

use std::sync::{Arc, OnceLock};

use crate::keys::{KeyPair, DEFAULT_KEY_BITS};

fn fixture(slot: &'static OnceLock<Arc<KeyPair>>) -> Arc<KeyPair> {
    Arc::clone(slot.get_or_init(|| {
        Arc::new(KeyPair::generate(DEFAULT_KEY_BITS).expect("fixture key generation"))
    }))
}

pub fn alice() -> Arc<KeyPair> {
    static SLOT: OnceLock<Arc<KeyPair>> = OnceLock::new();
    fixture(&SLOT)
}

pub fn bob() -> Arc<KeyPair> {
    static SLOT: OnceLock<Arc<KeyPair>> = OnceLock::new();
    fixture(&SLOT)
}

pub fn carol() -> Arc<KeyPair> {
    static SLOT: OnceLock<Arc<KeyPair>> = OnceLock::new();
    fixture(&SLOT)
}

/// A fourth pair, for servers (directory, relay) in multi-peer tests.
pub fn server() -> Arc<KeyPair> {
    static SLOT: OnceLock<Arc<KeyPair>> = OnceLock::new();
    fixture(&SLOT)
}
