//! Splitting payloads into cipher-sized pieces and joining them back.

/// Split `data` into consecutive pieces of at most `max_len` bytes.
///
/// Order is preserved and only the last piece may be shorter. Empty input
/// yields no pieces at all, so an empty payload seals to a lone signature.
///
/// # Panics
///
/// Panics if `max_len` is zero.
pub fn chop(data: &[u8], max_len: usize) -> Vec<&[u8]> {
    assert!(max_len > 0, "chop: max_len must be at least 1");
    data.chunks(max_len).collect()
}

/// Concatenate pieces in order. Left inverse of [`chop`].
pub fn stitch<I, B>(pieces: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for piece in pieces {
        out.extend_from_slice(piece.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chop_empty_yields_nothing() {
        assert!(chop(b"", 117).is_empty());
    }

    #[test]
    fn test_chop_last_piece_shorter() {
        let pieces = chop(b"abcdefg", 3);
        assert_eq!(pieces, vec![&b"abc"[..], &b"def"[..], &b"g"[..]]);
    }

    #[test]
    fn test_chop_exact_multiple() {
        let data = [7u8; 234];
        let pieces = chop(&data, 117);
        assert_eq!(pieces.len(), 2);
        assert!(pieces.iter().all(|p| p.len() == 117));
    }

    #[test]
    fn test_stitch_owned_pieces() {
        let pieces = vec![b"hel".to_vec(), b"lo".to_vec()];
        assert_eq!(stitch(pieces), b"hello");
    }

    #[test]
    #[should_panic]
    fn test_chop_zero_len_panics() {
        let _ = chop(b"abc", 0);
    }
}
