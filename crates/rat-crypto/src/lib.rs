//! Cryptographic primitives for rat.
//!
//! Messages travel as a run of RSA blocks sized to the key modulus: each
//! plaintext piece is encrypted to the recipient, and one trailing block
//! carries the sender's signature over the whole plaintext. This crate
//! owns every operation that touches key material.

#![forbid(unsafe_code)]

pub mod cipher;
pub mod chunk;
pub mod hash;
pub mod keys;
pub mod keystore;
pub mod testing;
pub mod utils;

#[cfg(test)]
mod proptests;

pub use cipher::{decrypt_chunk, encrypt_chunk, seal, sign, verify, CryptoError};
pub use chunk::{chop, stitch};
pub use keys::{KeyPair, SigningKey, VerifyingKey, DEFAULT_KEY_BITS, PADDING_OVERHEAD};
pub use keystore::{KeyBackend, KeyStore, KeyStoreError, MemoryBackend, PemFileBackend};
