//! Block encryption, signatures and message sealing.
//!
//! A sealed message is `E(p0) || E(p1) || ... || S(payload)` where every
//! block is exactly [`VerifyingKey::chunk_bytes`] long. There is no length
//! prefix: a reader finds the end of the message at the first block that
//! does not decrypt under its own key, and treats that block as the
//! signature. [`CryptoError::Decryption`] is therefore an expected,
//! recoverable outcome and not a fault.

use rand_core::OsRng;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign};
use sha2::Sha256;

use crate::chunk::chop;
use crate::hash::sha256;
use crate::keys::{SigningKey, VerifyingKey};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("plaintext of {len} bytes exceeds block capacity of {max}")]
    PlaintextTooLong { len: usize, max: usize },
    #[error("block did not decrypt under our key")]
    Decryption,
    #[error("signature verification failed")]
    Verification,
    #[error("key sizes differ: ours {ours} bytes, peer {peer} bytes")]
    KeySizeMismatch { ours: usize, peer: usize },
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("rsa operation failed: {0}")]
    Rsa(String),
}

/// Encrypt one block to `recipient`.
pub fn encrypt_chunk(plaintext: &[u8], recipient: &VerifyingKey) -> Result<Vec<u8>, CryptoError> {
    let max = recipient.max_plaintext();
    if plaintext.len() > max {
        return Err(CryptoError::PlaintextTooLong {
            len: plaintext.len(),
            max,
        });
    }
    recipient
        .rsa()
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| CryptoError::Rsa(e.to_string()))
}

/// Decrypt one block with our own key.
///
/// Any failure, including a block of the wrong length, is reported as
/// [`CryptoError::Decryption`].
pub fn decrypt_chunk(chunk: &[u8], own: &SigningKey) -> Result<Vec<u8>, CryptoError> {
    own.rsa()
        .decrypt(Pkcs1v15Encrypt, chunk)
        .map_err(|_| CryptoError::Decryption)
}

/// Sign `payload` (PKCS#1 v1.5 over SHA-256). The result is one block.
pub fn sign(payload: &[u8], own: &SigningKey) -> Result<Vec<u8>, CryptoError> {
    let digest = sha256(payload);
    own.rsa()
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| CryptoError::Rsa(e.to_string()))
}

pub fn verify(payload: &[u8], signature: &[u8], sender: &VerifyingKey) -> Result<(), CryptoError> {
    let digest = sha256(payload);
    sender
        .rsa()
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| CryptoError::Verification)
}

/// Build the full wire form of one message from `own` to `recipient`.
///
/// Both keys must share a modulus size, otherwise a reader could not
/// split the stream into blocks.
pub fn seal(
    payload: &[u8],
    own: &SigningKey,
    recipient: &VerifyingKey,
) -> Result<Vec<u8>, CryptoError> {
    let block = own.chunk_bytes();
    if recipient.chunk_bytes() != block {
        return Err(CryptoError::KeySizeMismatch {
            ours: block,
            peer: recipient.chunk_bytes(),
        });
    }

    let pieces = chop(payload, recipient.max_plaintext());
    let mut out = Vec::with_capacity((pieces.len() + 1) * block);
    for piece in pieces {
        out.extend_from_slice(&encrypt_chunk(piece, recipient)?);
    }
    out.extend_from_slice(&sign(payload, own)?);
    Ok(out)
}
