//! Shared crypto primitives: secure randomness and constant-time compare.

use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// The OS entropy source was unavailable or exhausted.
///
/// Fatal to the current operation; there is deliberately no fallback to a
/// weaker source.
#[derive(Debug, Error)]
#[error("secure random source unavailable")]
pub struct RandomSourceError(#[source] rand::Error);

/// Fill `buf` from the OS cryptographically secure random source.
pub fn fill_secure(buf: &mut [u8]) -> Result<(), RandomSourceError> {
    OsRng.try_fill_bytes(buf).map_err(RandomSourceError)
}

/// Constant-time byte comparison.
///
/// No early exit on mismatch, so timing does not reveal the position of
/// the first differing byte. Unequal lengths compare unequal.
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_secure_fills_buffer() {
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        fill_secure(&mut first).expect("entropy available");
        fill_secure(&mut second).expect("entropy available");
        // 32 zero bytes twice in a row would mean the source is broken.
        assert_ne!(first, second);
    }

    #[test]
    fn ct_eq_matches_equality() {
        assert!(ct_eq(b"same bytes", b"same bytes"));
        assert!(!ct_eq(b"same bytes", b"other byte"));
    }

    #[test]
    fn ct_eq_rejects_length_mismatch() {
        assert!(!ct_eq(b"short", b"longer input"));
        assert!(!ct_eq(b"", b"x"));
    }
}
