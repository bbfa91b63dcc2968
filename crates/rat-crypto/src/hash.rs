use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    let out = h.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

/// Key fingerprint: lowercase hex of sha256(der).
///
/// Peers compare these out of band; the handshake alone only proves that the
/// other side holds the private key, not who they are.
pub fn fingerprint(der: &[u8]) -> String {
    hex::encode(sha256(der))
}
