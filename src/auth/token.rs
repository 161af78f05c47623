//! Session token generation and one-way digests.
//!
//! A raw token is `SESSION_TOKEN_LEN_BYTES` of OS randomness, hex-encoded.
//! Storage only ever sees the SHA-256 digest of the token string; the raw
//! value is returned once to the caller and otherwise lives only in the
//! client's cookie.

use sha2::{Digest, Sha256};

use super::primitives::{self, RandomSourceError};

/// Raw token length in bytes before hex encoding (128 hex chars).
pub const SESSION_TOKEN_LEN_BYTES: usize = 64;

/// SHA-256 digest of a session token; the only form a token takes at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenDigest([u8; 32]);

impl TokenDigest {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Generate a fresh raw session token of `byte_len` random bytes.
///
/// # Errors
///
/// Fails if the entropy source is unavailable; there is no fallback.
pub fn generate_session_token(byte_len: usize) -> Result<String, RandomSourceError> {
    let mut bytes = vec![0u8; byte_len];
    primitives::fill_secure(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Digest the UTF-8 token string for storage and lookup.
#[must_use]
pub fn digest_token(token: &str) -> TokenDigest {
    TokenDigest(Sha256::digest(token.as_bytes()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_lowercase_hex_of_double_length() {
        let token = generate_session_token(SESSION_TOKEN_LEN_BYTES).expect("token");
        assert_eq!(token.len(), SESSION_TOKEN_LEN_BYTES * 2);
        assert!(token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn tokens_are_unique() {
        let first = generate_session_token(32).expect("token");
        let second = generate_session_token(32).expect("token");
        assert_ne!(first, second);
    }

    #[test]
    fn digest_is_stable_per_token() {
        let token = generate_session_token(32).expect("token");
        assert_eq!(digest_token(&token), digest_token(&token));
        assert_ne!(digest_token(&token), digest_token("other"));
    }

    #[test]
    fn digest_matches_known_vector() {
        // SHA-256 of the ASCII string "abc".
        let digest = digest_token("abc");
        assert_eq!(
            hex::encode(digest.as_bytes()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
