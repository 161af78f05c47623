//! Argon2id password hashing with self-describing encoded records.
//!
//! A credential record carries its own cost parameters:
//!
//! ```text
//! $argon2id$v=19$m=65536,t=1,p=4$<salt-b64>$<key-b64>
//! ```
//!
//! Verification re-derives the key with the parameters *parsed from the
//! record*, not the current defaults, so cost profiles can be raised for
//! new registrations without migrating old rows. The final comparison is
//! constant-time.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use thiserror::Error;

use super::primitives::{self, RandomSourceError};

const ALG_TAG: &str = "argon2id";

const DEFAULT_VERSION: u32 = 0x13;
const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
const DEFAULT_TIME_COST: u32 = 1;
const DEFAULT_PARALLELISM: u32 = 4;
const DEFAULT_SALT_LEN: usize = 16;
const DEFAULT_KEY_LEN: usize = 16;

/// Errors from hashing or verifying a credential record.
///
/// Messages never carry password or key material.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The encoded record does not have the expected shape.
    #[error("malformed credential record")]
    Malformed,
    /// The record's algorithm tag is not `argon2id`.
    #[error("unsupported credential algorithm")]
    UnsupportedAlgorithm,
    /// The OS entropy source failed while generating a salt.
    #[error(transparent)]
    RandomSource(#[from] RandomSourceError),
    /// Key derivation itself failed (e.g. unusable parsed parameters).
    #[error("key derivation failed: {0}")]
    Kdf(argon2::Error),
}

/// Argon2id cost parameters as carried by an encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub version: u32,
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            memory_kib: DEFAULT_MEMORY_KIB,
            time_cost: DEFAULT_TIME_COST,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// Hashes passwords into encoded records with a fixed cost profile.
///
/// Hashing is CPU- and memory-expensive by design (tens of milliseconds
/// at the defaults); callers on an async runtime should off-load it to a
/// blocking thread.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: KdfParams,
    salt_len: usize,
    key_len: usize,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: KdfParams::default(),
            salt_len: DEFAULT_SALT_LEN,
            key_len: DEFAULT_KEY_LEN,
        }
    }
}

impl CredentialHasher {
    #[must_use]
    pub fn new(params: KdfParams, salt_len: usize, key_len: usize) -> Self {
        Self {
            params,
            salt_len,
            key_len,
        }
    }

    /// Hash a password into a self-describing encoded record.
    ///
    /// Every call draws a fresh salt, so two hashes of the same password
    /// produce different records that both verify.
    ///
    /// # Errors
    ///
    /// Fails only if the entropy source is unavailable or the configured
    /// parameters are unusable.
    pub fn hash(&self, password: &[u8]) -> Result<String, CredentialError> {
        let mut salt = vec![0u8; self.salt_len];
        primitives::fill_secure(&mut salt)?;

        let mut key = vec![0u8; self.key_len];
        derive_key(&self.params, password, &salt, &mut key)?;

        Ok(encode_record(&self.params, &salt, &key))
    }
}

/// Check a password against a stored encoded record.
///
/// Returns `Ok(false)` on mismatch; a mismatch is not an error. The key
/// comparison is constant-time over the full key length.
///
/// # Errors
///
/// Returns [`CredentialError::Malformed`] or
/// [`CredentialError::UnsupportedAlgorithm`] when the record cannot be
/// parsed; these are independent of the supplied password.
pub fn verify(password: &[u8], record: &str) -> Result<bool, CredentialError> {
    let parsed = ParsedRecord::parse(record)?;

    let mut derived = vec![0u8; parsed.key.len()];
    derive_key(&parsed.params, password, &parsed.salt, &mut derived)?;

    Ok(primitives::ct_eq(&derived, &parsed.key))
}

/// A decoded credential record.
///
/// Salt and key lengths are recovered from the decoded byte lengths, not
/// re-declared in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedRecord {
    pub(crate) params: KdfParams,
    pub(crate) salt: Vec<u8>,
    pub(crate) key: Vec<u8>,
}

impl ParsedRecord {
    /// Parse a `$`-delimited record of exactly 6 fields (the first being
    /// the empty field before the leading `$`).
    pub(crate) fn parse(record: &str) -> Result<Self, CredentialError> {
        let fields: Vec<&str> = record.split('$').collect();
        if fields.len() != 6 || !fields[0].is_empty() {
            return Err(CredentialError::Malformed);
        }
        if fields[1] != ALG_TAG {
            return Err(CredentialError::UnsupportedAlgorithm);
        }

        let version = parse_tagged_u32(fields[2], "v=")?;

        let mut costs = fields[3].split(',');
        let memory_kib = parse_tagged_u32(costs.next().unwrap_or(""), "m=")?;
        let time_cost = parse_tagged_u32(costs.next().unwrap_or(""), "t=")?;
        let parallelism = parse_tagged_u32(costs.next().unwrap_or(""), "p=")?;
        if costs.next().is_some() {
            return Err(CredentialError::Malformed);
        }

        let salt = STANDARD_NO_PAD
            .decode(fields[4])
            .map_err(|_| CredentialError::Malformed)?;
        let key = STANDARD_NO_PAD
            .decode(fields[5])
            .map_err(|_| CredentialError::Malformed)?;

        Ok(Self {
            params: KdfParams {
                version,
                memory_kib,
                time_cost,
                parallelism,
            },
            salt,
            key,
        })
    }

    /// Re-encode the record; parsing then encoding is lossless.
    #[cfg(test)]
    pub(crate) fn encode(&self) -> String {
        encode_record(&self.params, &self.salt, &self.key)
    }
}

fn encode_record(params: &KdfParams, salt: &[u8], key: &[u8]) -> String {
    format!(
        "${ALG_TAG}$v={}$m={},t={},p={}${}${}",
        params.version,
        params.memory_kib,
        params.time_cost,
        params.parallelism,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(key),
    )
}

fn parse_tagged_u32(field: &str, tag: &str) -> Result<u32, CredentialError> {
    let digits = field.strip_prefix(tag).ok_or(CredentialError::Malformed)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CredentialError::Malformed);
    }
    digits.parse().map_err(|_| CredentialError::Malformed)
}

fn derive_key(
    params: &KdfParams,
    password: &[u8],
    salt: &[u8],
    out: &mut [u8],
) -> Result<(), CredentialError> {
    let version = Version::try_from(params.version).map_err(|_| CredentialError::Malformed)?;
    let argon_params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.parallelism,
        Some(out.len()),
    )
    .map_err(|_| CredentialError::Malformed)?;

    Argon2::new(Algorithm::Argon2id, version, argon_params)
        .hash_password_into(password, salt, out)
        .map_err(CredentialError::Kdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    // Low-cost profile so the suite stays fast; the shape of the record
    // does not depend on the cost values.
    fn cheap_hasher() -> CredentialHasher {
        CredentialHasher::new(
            KdfParams {
                memory_kib: 8,
                time_cost: 1,
                parallelism: 1,
                ..KdfParams::default()
            },
            16,
            16,
        )
    }

    #[test]
    fn hash_then_verify_round_trips() {
        let hasher = cheap_hasher();
        let record = hasher.hash(b"correct horse").expect("hash");
        assert!(verify(b"correct horse", &record).expect("verify"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = cheap_hasher();
        let record = hasher.hash(b"correct horse").expect("hash");
        assert!(!verify(b"battery staple", &record).expect("verify"));
    }

    #[test]
    fn hash_is_salted() {
        let hasher = cheap_hasher();
        let first = hasher.hash(b"same password").expect("hash");
        let second = hasher.hash(b"same password").expect("hash");
        assert_ne!(first, second);
        assert!(verify(b"same password", &first).expect("verify"));
        assert!(verify(b"same password", &second).expect("verify"));
    }

    #[test]
    fn record_has_six_dollar_fields() {
        let record = cheap_hasher().hash(b"password").expect("hash");
        assert_eq!(record.split('$').count(), 6);
        assert!(record.starts_with('$'));
    }

    #[test]
    fn default_profile_matches_expected_shape() {
        let record = CredentialHasher::default().hash(b"password").expect("hash");
        let pattern = Regex::new(
            r"^\$argon2id\$v=\d+\$m=65536,t=1,p=4\$[A-Za-z0-9+/]{22}\$[A-Za-z0-9+/]{22}$",
        )
        .expect("pattern");
        assert!(pattern.is_match(&record), "unexpected record: {record}");
    }

    #[test]
    fn parse_recovers_lengths_and_re_encodes_losslessly() {
        let record = cheap_hasher().hash(b"password").expect("hash");
        let parsed = ParsedRecord::parse(&record).expect("parse");
        assert_eq!(parsed.salt.len(), 16);
        assert_eq!(parsed.key.len(), 16);
        assert_eq!(parsed.encode(), record);
    }

    #[test]
    fn verify_uses_parameters_from_the_record() {
        // Hash under one profile, verify with a hasher that has moved on
        // to a different default; only the record's own parameters matter.
        let old = CredentialHasher::new(
            KdfParams {
                memory_kib: 8,
                time_cost: 2,
                parallelism: 1,
                ..KdfParams::default()
            },
            16,
            16,
        );
        let record = old.hash(b"password").expect("hash");
        assert!(verify(b"password", &record).expect("verify"));
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        assert!(matches!(
            ParsedRecord::parse("$argon2id$v=19$m=8,t=1,p=1$AAAA"),
            Err(CredentialError::Malformed)
        ));
        assert!(matches!(
            ParsedRecord::parse("no dollars at all"),
            Err(CredentialError::Malformed)
        ));
    }

    #[test]
    fn parse_rejects_unknown_algorithm() {
        let record = cheap_hasher().hash(b"password").expect("hash");
        let tampered = record.replace("argon2id", "scrypt");
        assert!(matches!(
            ParsedRecord::parse(&tampered),
            Err(CredentialError::UnsupportedAlgorithm)
        ));
    }

    #[test]
    fn parse_rejects_bad_numeric_fields() {
        for record in [
            "$argon2id$v=nineteen$m=8,t=1,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$m=8,t=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$m=8,t=1,p=1,x=9$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$t=1,m=8,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$m=-8,t=1,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAA",
        ] {
            assert!(
                matches!(ParsedRecord::parse(record), Err(CredentialError::Malformed)),
                "accepted: {record}"
            );
        }
    }

    #[test]
    fn parse_rejects_invalid_base64() {
        for record in [
            "$argon2id$v=19$m=8,t=1,p=1$!!notbase64!!$AAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$m=8,t=1,p=1$AAAAAAAAAAAAAAAAAAAAAA$??",
        ] {
            assert!(
                matches!(ParsedRecord::parse(record), Err(CredentialError::Malformed)),
                "accepted: {record}"
            );
        }
    }

    #[test]
    fn verify_surfaces_parse_errors() {
        assert!(verify(b"password", "garbage").is_err());
    }
}
