//! Re-slicing a byte stream into fixed-size blocks.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::trace;

use crate::error::TransportError;
use crate::liveness::{Liveness, POLL_INTERVAL};

const READ_RESERVE: usize = 4096;

/// Buffers whatever the stream delivers and hands it out in
/// `chunk_bytes`-sized pieces, oldest first.
///
/// Reads are polled with [`POLL_INTERVAL`] timeouts; a timeout just means
/// "check the flag and try again". The reader ends, without error, when the
/// peer closes the stream or the [`Liveness`] flag is cleared. Bytes that
/// were already buffered are still handed out after a stop.
pub struct ChunkReader<R> {
    inner: R,
    buf: BytesMut,
    chunk_bytes: usize,
    liveness: Liveness,
    eof: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(inner: R, chunk_bytes: usize, liveness: Liveness) -> Self {
        assert!(chunk_bytes > 0, "chunk size must be non-zero");
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_RESERVE),
            chunk_bytes,
            liveness,
            eof: false,
        }
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Bytes received but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next full block, or `None` once the stream has ended or been stopped.
    ///
    /// A trailing partial block left at end of stream is discarded.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        let n = self.chunk_bytes;
        self.take(n).await
    }

    /// Exactly `n` raw bytes, ignoring block alignment. Used for the
    /// cleartext steps that precede encrypted traffic.
    pub async fn read_exact_raw(&mut self, n: usize) -> Result<Option<Bytes>, TransportError> {
        self.take(n).await
    }

    /// Between 1 and `max` raw bytes: whatever is buffered, or else
    /// whatever the next read delivers. `None` once the stream has ended
    /// or been stopped.
    pub async fn read_up_to(&mut self, max: usize) -> Result<Option<Bytes>, TransportError> {
        if max == 0 {
            return Ok(Some(Bytes::new()));
        }
        if self.buf.is_empty() && !self.fill().await? {
            return Ok(None);
        }
        let n = max.min(self.buf.len());
        Ok(Some(self.buf.split_to(n).freeze()))
    }

    async fn take(&mut self, n: usize) -> Result<Option<Bytes>, TransportError> {
        loop {
            if self.buf.len() >= n {
                return Ok(Some(self.buf.split_to(n).freeze()));
            }
            if !self.fill().await? {
                if !self.buf.is_empty() {
                    trace!(pending = self.buf.len(), wanted = n, "stream ended mid-block");
                }
                return Ok(None);
            }
        }
    }

    /// Wait for more bytes. `false` means no more will come.
    async fn fill(&mut self) -> Result<bool, TransportError> {
        loop {
            if self.eof || !self.liveness.is_alive() {
                return Ok(false);
            }
            self.buf.reserve(READ_RESERVE);
            match timeout(POLL_INTERVAL, self.inner.read_buf(&mut self.buf)).await {
                Err(_elapsed) => continue,
                Ok(Ok(0)) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(Ok(_)) => return Ok(true),
                Ok(Err(e)) => match e.kind() {
                    io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::Interrupted => continue,
                    io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof => {
                        trace!(error = %e, "peer went away");
                        self.eof = true;
                        return Ok(false);
                    }
                    _ => return Err(e.into()),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_reassembles_fragmented_reads() {
        let mock = Builder::new()
            .read(b"ab")
            .read(b"cde")
            .read(b"fgh")
            .build();
        let mut reader = ChunkReader::new(mock, 4, Liveness::new());

        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), &b"abcd"[..]);
        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), &b"efgh"[..]);
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_one_read_yields_several_chunks() {
        let mock = Builder::new().read(b"aabbcc").build();
        let mut reader = ChunkReader::new(mock, 2, Liveness::new());

        for expected in [&b"aa"[..], &b"bb"[..], &b"cc"[..]] {
            assert_eq!(reader.next_chunk().await.unwrap().unwrap(), expected);
        }
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_chunk_at_eof_is_dropped() {
        let mock = Builder::new().read(b"abc").build();
        let mut reader = ChunkReader::new(mock, 4, Liveness::new());
        assert!(reader.next_chunk().await.unwrap().is_none());
        assert_eq!(reader.buffered(), 3);
    }

    #[tokio::test]
    async fn test_reset_is_end_of_stream() {
        let mock = Builder::new()
            .read(b"abcd")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut reader = ChunkReader::new(mock, 4, Liveness::new());
        assert!(reader.next_chunk().await.unwrap().is_some());
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_other_io_errors_surface() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::PermissionDenied, "nope"))
            .build();
        let mut reader = ChunkReader::new(mock, 4, Liveness::new());
        assert!(matches!(
            reader.next_chunk().await,
            Err(TransportError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_raw_read_then_chunks() {
        let mock = Builder::new().read(b"pepperXXYY").build();
        let mut reader = ChunkReader::new(mock, 2, Liveness::new());
        assert_eq!(reader.read_exact_raw(6).await.unwrap().unwrap(), &b"pepper"[..]);
        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), &b"XX"[..]);
        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), &b"YY"[..]);
    }

    #[tokio::test]
    async fn test_read_up_to_takes_what_is_there() {
        let mock = Builder::new().read(b"pep").read(b"perXY").build();
        let mut reader = ChunkReader::new(mock, 2, Liveness::new());

        assert_eq!(reader.read_up_to(6).await.unwrap().unwrap(), &b"pep"[..]);
        assert_eq!(reader.read_up_to(3).await.unwrap().unwrap(), &b"per"[..]);
        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), &b"XY"[..]);
        assert!(reader.read_up_to(4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stop_ends_idle_read_within_poll_interval() {
        let (local, _remote) = tokio::io::duplex(64);
        let liveness = Liveness::new();
        let mut reader = ChunkReader::new(local, 4, liveness.clone());

        let stopper = liveness.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.stop();
        });

        let res = timeout(Duration::from_secs(2), reader.next_chunk())
            .await
            .expect("reader did not observe stop");
        assert!(res.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slow_writer_is_not_an_error() {
        let (local, mut remote) = tokio::io::duplex(64);
        let mut reader = ChunkReader::new(local, 3, Liveness::new());

        tokio::spawn(async move {
            remote.write_all(b"x").await.unwrap();
            tokio::time::sleep(POLL_INTERVAL * 3).await;
            remote.write_all(b"yz").await.unwrap();
        });

        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), &b"xyz"[..]);
    }
}
