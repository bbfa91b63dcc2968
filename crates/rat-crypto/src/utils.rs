//! Constant-time comparison for shared secrets.

use constant_time_eq::constant_time_eq;

/// Compare two byte slices without leaking where they first differ.
///
/// ```rust
/// use rat_crypto::utils::constant_time_compare;
///
/// assert!(constant_time_compare(b"pepper", b"pepper"));
/// assert!(!constant_time_compare(b"pepper", b"salt!!"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    constant_time_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare(b"hello world", b"hello world"));
    }

    #[test]
    fn test_constant_time_compare_different() {
        assert!(!constant_time_compare(b"hello world", b"hello worlD"));
    }

    #[test]
    fn test_constant_time_compare_different_length() {
        assert!(!constant_time_compare(b"hello", b"hello world"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare(b"", b""));
    }
}
