//! RSA key pairs.
//!
//! The verifying key doubles as a peer's identity token, so it compares and
//! hashes by its canonical PKCS#1 DER encoding.

use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;
use rand_core::OsRng;
use rsa::pkcs1::{
    DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding,
};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::cipher::CryptoError;
use crate::hash::fingerprint;

/// Key size used when configuration does not say otherwise.
pub const DEFAULT_KEY_BITS: usize = 1024;

/// Bytes of every block consumed by PKCS#1 v1.5 encryption padding.
pub const PADDING_OVERHEAD: usize = 11;

/// Public half of a key pair.
#[derive(Clone)]
pub struct VerifyingKey {
    key: RsaPublicKey,
    der: Bytes,
}

impl VerifyingKey {
    /// Parse a PKCS#1 DER public key.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_pkcs1_der(der)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_rsa(key)
    }

    /// Parse a PKCS#1 PEM public key.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_rsa(key)
    }

    fn from_rsa(key: RsaPublicKey) -> Result<Self, CryptoError> {
        // Re-encode so two spellings of one key compare equal.
        let doc = key
            .to_pkcs1_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self {
            der: Bytes::copy_from_slice(doc.as_bytes()),
            key,
        })
    }

    /// Canonical PKCS#1 DER encoding. This is what goes on the wire.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Size of one cipher block for this key: the modulus length in bytes.
    pub fn chunk_bytes(&self) -> usize {
        self.key.size()
    }

    /// Largest plaintext a single block can carry.
    pub fn max_plaintext(&self) -> usize {
        self.chunk_bytes() - PADDING_OVERHEAD
    }

    /// Lowercase hex SHA-256 of the DER key.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.der)
    }

    pub(crate) fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }
}

impl PartialEq for VerifyingKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for VerifyingKey {}

impl Hash for VerifyingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fp = self.fingerprint();
        f.debug_tuple("VerifyingKey").field(&&fp[..16]).finish()
    }
}

/// Private half of a key pair.
#[derive(Clone)]
pub struct SigningKey {
    key: RsaPrivateKey,
}

impl SigningKey {
    pub fn chunk_bytes(&self) -> usize {
        self.key.size()
    }

    pub(crate) fn rsa(&self) -> &RsaPrivateKey {
        &self.key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// A signing key together with its verifying key.
#[derive(Clone, Debug)]
pub struct KeyPair {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl KeyPair {
    /// Generate a fresh pair with a modulus of `bits` bits.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        if bits % 8 != 0 {
            return Err(CryptoError::KeyGeneration(format!(
                "{bits} bits is not a whole number of bytes"
            )));
        }
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_rsa(key)
    }

    /// Parse a PKCS#1 PEM private key.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_rsa(key)
    }

    fn from_rsa(key: RsaPrivateKey) -> Result<Self, CryptoError> {
        let verifying = VerifyingKey::from_rsa(RsaPublicKey::from(&key))?;
        Ok(Self {
            signing: SigningKey { key },
            verifying,
        })
    }

    /// PKCS#1 PEM encoding of the private key.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        let pem = self
            .signing
            .key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(pem.as_str().to_owned())
    }

    pub fn signing(&self) -> &SigningKey {
        &self.signing
    }

    pub fn verifying(&self) -> &VerifyingKey {
        &self.verifying
    }

    pub fn chunk_bytes(&self) -> usize {
        self.signing.chunk_bytes()
    }

    pub fn max_plaintext(&self) -> usize {
        self.verifying.max_plaintext()
    }
}
