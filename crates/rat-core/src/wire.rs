//! One logical message on the wire.
//!
//! A message is a run of ciphertext blocks followed by exactly one
//! signature block, with no length prefix. The receiver decrypts blocks
//! until one fails to decrypt under its own key; that block is the
//! signature over everything decrypted so far.
//!
//! A corrupted ciphertext block is indistinguishable from the signature
//! and shows up as [`ProtocolError::Verification`]. Conversely a signature
//! block decrypts as valid padding with probability around 2^-16, in which
//! case the message runs on into the next one and also fails verification.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use rat_crypto::{decrypt_chunk, seal, verify, CryptoError, SigningKey, VerifyingKey};
use rat_transport::ChunkReader;

use crate::errors::ProtocolError;

/// Upper bound on one reassembled message.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Encrypt `payload` to `recipient`, sign it with `own` and write the whole
/// message in one write.
pub async fn send<W>(
    writer: &mut W,
    payload: &[u8],
    own: &SigningKey,
    recipient: &VerifyingKey,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let sealed = seal(payload, own, recipient)?;
    writer.write_all(&sealed).await?;
    writer.flush().await?;
    trace!(payload = payload.len(), wire = sealed.len(), "message sent");
    Ok(())
}

/// Read one message without checking its signature.
///
/// Returns the plaintext and the trailing block. Only the handshake needs
/// this, because it learns the sender's key from the plaintext itself.
pub async fn read_sealed<R>(
    reader: &mut ChunkReader<R>,
    own: &SigningKey,
) -> Result<(Vec<u8>, Bytes), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    if reader.chunk_bytes() != own.chunk_bytes() {
        return Err(ProtocolError::violation(format_args!(
            "reader block size {} does not match key size {}",
            reader.chunk_bytes(),
            own.chunk_bytes()
        )));
    }

    let mut plain = Vec::new();
    while let Some(chunk) = reader.next_chunk().await? {
        match decrypt_chunk(&chunk, own) {
            Ok(piece) => {
                plain.extend_from_slice(&piece);
                if plain.len() > MAX_MESSAGE_BYTES {
                    return Err(ProtocolError::violation("message too large"));
                }
            }
            Err(CryptoError::Decryption) => return Ok((plain, chunk)),
            Err(e) => return Err(e.into()),
        }
    }
    Err(ProtocolError::RemoteDisconnected)
}

/// Read one message and verify it came from `sender`.
pub async fn receive<R>(
    reader: &mut ChunkReader<R>,
    own: &SigningKey,
    sender: &VerifyingKey,
) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let (plain, signature) = read_sealed(reader, own).await?;
    verify(&plain, &signature, sender)?;
    trace!(payload = plain.len(), "message verified");
    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rat_crypto::testing;
    use rat_transport::testing::duplex_pair;
    use rat_transport::Liveness;

    #[tokio::test]
    async fn test_send_receive_sizes() {
        let alice = testing::alice();
        let bob = testing::bob();
        let max = bob.max_plaintext();

        for len in [0, 1, max, max + 1, 10 * max] {
            let liveness = Liveness::new();
            let (a, b) = duplex_pair(&liveness);
            let (_ar, mut aw) = a.split(alice.chunk_bytes());
            let (mut br, _bw) = b.split(bob.chunk_bytes());

            let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
            send(&mut aw, &payload, alice.signing(), bob.verifying())
                .await
                .unwrap();
            let got = receive(&mut br, bob.signing(), alice.verifying())
                .await
                .unwrap();
            assert_eq!(got, payload, "payload of {len} bytes");
        }
    }

    #[tokio::test]
    async fn test_back_to_back_messages_stay_separate() {
        let alice = testing::alice();
        let bob = testing::bob();
        let liveness = Liveness::new();
        let (a, b) = duplex_pair(&liveness);
        let (_ar, mut aw) = a.split(128);
        let (mut br, _bw) = b.split(128);

        for msg in [&b"one"[..], &b"two"[..], &b""[..]] {
            send(&mut aw, msg, alice.signing(), bob.verifying()).await.unwrap();
        }
        for msg in [&b"one"[..], &b"two"[..], &b""[..]] {
            let got = receive(&mut br, bob.signing(), alice.verifying()).await.unwrap();
            assert_eq!(got, msg);
        }
    }

    #[tokio::test]
    async fn test_wrong_sender_key_is_verification_error() {
        let alice = testing::alice();
        let bob = testing::bob();
        let liveness = Liveness::new();
        let (a, b) = duplex_pair(&liveness);
        let (_ar, mut aw) = a.split(128);
        let (mut br, _bw) = b.split(128);

        send(&mut aw, b"hello", alice.signing(), bob.verifying()).await.unwrap();
        let err = receive(&mut br, bob.signing(), testing::carol().verifying())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Verification));
    }

    #[tokio::test]
    async fn test_close_mid_message_is_remote_disconnected() {
        let alice = testing::alice();
        let bob = testing::bob();
        let liveness = Liveness::new();
        let (a, b) = duplex_pair(&liveness);
        let (mut br, _bw) = b.split(128);

        // Ciphertext without its signature block, then hang up.
        let sealed = seal(b"cut short", alice.signing(), bob.verifying()).unwrap();
        let mut stream = a.into_inner();
        stream.write_all(&sealed[..128]).await.unwrap();
        drop(stream);

        let err = receive(&mut br, bob.signing(), alice.verifying())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::RemoteDisconnected));
    }

    #[tokio::test]
    async fn test_read_sealed_returns_signature_block() {
        let alice = testing::alice();
        let bob = testing::bob();
        let liveness = Liveness::new();
        let (a, b) = duplex_pair(&liveness);
        let (_ar, mut aw) = a.split(128);
        let (mut br, _bw) = b.split(128);

        send(&mut aw, b"abc", alice.signing(), bob.verifying()).await.unwrap();
        let (plain, sig) = read_sealed(&mut br, bob.signing()).await.unwrap();
        assert_eq!(plain, b"abc");
        assert_eq!(sig.len(), 128);
        verify(&plain, &sig, alice.verifying()).unwrap();
    }
}
