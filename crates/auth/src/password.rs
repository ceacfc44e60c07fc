//! Argon2id password hashing and the `$argon2id$...` encoded-hash format.
//!
//! Stored hashes look like
//! `$argon2id$v=19$m=65536,t=2,p=4$<salt>$<digest>` where both trailing
//! fields are unpadded standard base64. The shape is persisted in the
//! account table and must stay stable.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Algorithm tag written into (and required from) every encoded hash.
pub const ALGORITHM_TAG: &str = "argon2id";

/// Argon2 version 0x13, the only version this codec derives with.
pub const ARGON2_VERSION: u32 = 0x13;

const FIELD_COUNT: usize = 6;

/// Cost parameters used when creating new hashes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HashingParams {
    /// Iterations.
    pub time_cost: u32,
    /// Memory in KiB.
    pub memory_cost: u32,
    /// Lanes.
    pub parallelism: u32,
    /// Digest size in bytes.
    pub key_length: usize,
    /// Salt size in bytes.
    pub salt_length: usize,
}

impl HashingParams {
    pub const DEFAULT: HashingParams = HashingParams {
        time_cost: 2,
        memory_cost: 64 * 1024,
        parallelism: 4,
        key_length: 32,
        salt_length: 16,
    };
}

impl Default for HashingParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Decoded form of an encoded hash.
///
/// The key length is not stored separately; it is the digest length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argon2Parameters {
    pub time_cost: u32,
    pub memory_cost: u32,
    pub parallelism: u32,
    pub salt: Vec<u8>,
    pub digest: Vec<u8>,
}

/// A stored hash could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialFormatError {
    #[error("invalid hash format structure: expected 6 '$'-delimited fields, found {0}")]
    FieldCount(usize),

    #[error("invalid hash format structure: missing leading '$'")]
    MissingLeadingDelimiter,

    #[error("invalid hash format structure: field {0} is empty")]
    EmptyField(usize),

    #[error("unsupported algorithm variant '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("malformed version field '{0}'")]
    MalformedVersion(String),

    #[error("unsupported argon2 version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed parameter field '{0}'")]
    MalformedParameters(String),

    #[error("{field} decoding failed: {reason}")]
    Base64 { field: &'static str, reason: String },

    #[error("invalid argon2 parameters: {0}")]
    InvalidParameters(argon2::Error),
}

/// A new hash could not be produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("salt generation failed: {0}")]
    RandomSource(getrandom::Error),

    #[error("key derivation failed: {0}")]
    Derivation(#[from] argon2::Error),
}

impl Argon2Parameters {
    pub fn key_length(&self) -> usize {
        self.digest.len()
    }

    /// Serialize to the `$argon2id$v=..$m=..,t=..,p=..$salt$digest` form.
    pub fn encode(&self) -> String {
        format!(
            "${ALGORITHM_TAG}$v={ARGON2_VERSION}$m={},t={},p={}${}${}",
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            STANDARD_NO_PAD.encode(&self.salt),
            STANDARD_NO_PAD.encode(&self.digest),
        )
    }

    /// Parse an encoded hash.
    ///
    /// The leading `$` yields an empty first field; the other five must be
    /// non-empty.
    pub fn decode(encoded: &str) -> Result<Self, CredentialFormatError> {
        let fields: Vec<&str> = encoded.split('$').collect();
        if fields.len() != FIELD_COUNT {
            return Err(CredentialFormatError::FieldCount(fields.len()));
        }
        if !fields[0].is_empty() {
            return Err(CredentialFormatError::MissingLeadingDelimiter);
        }
        if let Some(idx) = fields.iter().skip(1).position(|f| f.is_empty()) {
            return Err(CredentialFormatError::EmptyField(idx + 1));
        }

        if fields[1] != ALGORITHM_TAG {
            return Err(CredentialFormatError::UnsupportedAlgorithm(fields[1].to_string()));
        }

        let version = parse_version(fields[2])?;
        if version != ARGON2_VERSION {
            return Err(CredentialFormatError::UnsupportedVersion(version));
        }

        let (memory_cost, time_cost, parallelism) = parse_costs(fields[3])?;
        let salt = decode_b64("salt", fields[4])?;
        let digest = decode_b64("hash", fields[5])?;

        let decoded = Self {
            time_cost,
            memory_cost,
            parallelism,
            salt,
            digest,
        };
        decoded.argon2().map_err(CredentialFormatError::InvalidParameters)?;
        Ok(decoded)
    }

    fn argon2(&self) -> Result<Argon2<'static>, argon2::Error> {
        argon2_for(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.key_length(),
        )
    }

    /// Re-derive a digest for `password` with this hash's own parameters.
    fn derive(&self, password: &[u8]) -> Result<Vec<u8>, argon2::Error> {
        let mut out = vec![0u8; self.key_length()];
        self.argon2()?
            .hash_password_into(password, &self.salt, &mut out)?;
        Ok(out)
    }

    fn matches_params(&self, params: &HashingParams) -> bool {
        self.time_cost == params.time_cost
            && self.memory_cost == params.memory_cost
            && self.parallelism == params.parallelism
            && self.key_length() == params.key_length
            && self.salt.len() == params.salt_length
    }
}

fn argon2_for(
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
    key_length: usize,
) -> Result<Argon2<'static>, argon2::Error> {
    let params = Params::new(memory_cost, time_cost, parallelism, Some(key_length))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn parse_version(field: &str) -> Result<u32, CredentialFormatError> {
    field
        .strip_prefix("v=")
        .and_then(parse_decimal)
        .ok_or_else(|| CredentialFormatError::MalformedVersion(field.to_string()))
}

/// Canonical unsigned decimal: digits only, no sign, no leading zeros.
fn parse_decimal(value: &str) -> Option<u32> {
    let canonical = !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && (value == "0" || !value.starts_with('0'));
    if canonical { value.parse::<u32>().ok() } else { None }
}

/// Parse exactly `m=<uint>,t=<uint>,p=<uint>`.
fn parse_costs(field: &str) -> Result<(u32, u32, u32), CredentialFormatError> {
    let malformed = || CredentialFormatError::MalformedParameters(field.to_string());

    let mut parts = field.split(',');
    let mut next = |key: &str| -> Result<u32, CredentialFormatError> {
        parts
            .next()
            .and_then(|p| p.strip_prefix(key))
            .and_then(parse_decimal)
            .ok_or_else(malformed)
    };

    let m = next("m=")?;
    let t = next("t=")?;
    let p = next("p=")?;
    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok((m, t, p))
}

fn decode_b64(field: &'static str, value: &str) -> Result<Vec<u8>, CredentialFormatError> {
    STANDARD_NO_PAD
        .decode(value)
        .map_err(|e| CredentialFormatError::Base64 {
            field,
            reason: e.to_string(),
        })
}

/// Hash `password` with [`HashingParams::DEFAULT`] and a fresh random salt.
pub fn hash(password: &str) -> Result<String, HashError> {
    hash_with(password, &HashingParams::DEFAULT)
}

/// Hash `password` with explicit cost parameters and a fresh random salt.
pub fn hash_with(password: &str, params: &HashingParams) -> Result<String, HashError> {
    let mut salt = vec![0u8; params.salt_length];
    getrandom::getrandom(&mut salt).map_err(HashError::RandomSource)?;

    let mut digest = vec![0u8; params.key_length];
    argon2_for(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        params.key_length,
    )?
    .hash_password_into(password.as_bytes(), &salt, &mut digest)?;

    Ok(Argon2Parameters {
        time_cost: params.time_cost,
        memory_cost: params.memory_cost,
        parallelism: params.parallelism,
        salt,
        digest,
    }
    .encode())
}

/// Parse a stored hash.
pub fn decode(encoded: &str) -> Result<Argon2Parameters, CredentialFormatError> {
    Argon2Parameters::decode(encoded)
}

/// Check `password` against a stored hash.
///
/// Returns `Ok(false)` on mismatch and `Err` only when the stored hash is
/// malformed. Derivation uses the stored cost parameters, so hashes created
/// under older settings keep verifying.
pub fn verify(encoded: &str, password: &str) -> Result<bool, CredentialFormatError> {
    let stored = Argon2Parameters::decode(encoded)?;
    let computed = stored
        .derive(password.as_bytes())
        .map_err(CredentialFormatError::InvalidParameters)?;
    Ok(bool::from(stored.digest.as_slice().ct_eq(computed.as_slice())))
}

/// Whether a stored hash was produced with parameters other than `params`.
pub fn needs_rehash(encoded: &str, params: &HashingParams) -> Result<bool, CredentialFormatError> {
    Ok(!Argon2Parameters::decode(encoded)?.matches_params(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CHEAP: HashingParams = HashingParams {
        time_cost: 1,
        memory_cost: 64,
        parallelism: 1,
        key_length: 32,
        salt_length: 16,
    };

    // Produced by an independent Argon2id implementation.
    const REFERENCE_DEFAULT: &str = "$argon2id$v=19$m=65536,t=2,p=4$d21zLXN0YXRpYy1zYWx0IQ$NPdg8uts5Br7LyhYc7IY4/A1nYdgvwOohVUwrCGyNKo";
    const REFERENCE_CHEAP: &str = "$argon2id$v=19$m=64,t=1,p=1$d21zLXN0YXRpYy1zYWx0IQ$36P1MIJs9QF9QB7czfTayfCXtzjhPr0qZA8+M5pEueg";
    const REFERENCE_UNICODE: &str = "$argon2id$v=19$m=32,t=1,p=2$MDEyMzQ1Njc4OWFiY2RlZg$jHjlOEtaSZQNv7qr8Biucg";

    #[test]
    fn default_hash_has_expected_shape() {
        let encoded = hash("secret").unwrap();
        assert!(encoded.starts_with("$argon2id$v=19$m=65536,t=2,p=4$"));

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.salt.len(), 16);
        assert_eq!(decoded.key_length(), 32);
        assert!(verify(&encoded, "secret").unwrap());
        assert!(!needs_rehash(&encoded, &HashingParams::DEFAULT).unwrap());
    }

    #[test]
    fn verifies_same_password() {
        let long = format!("{}🙂🙃", "x".repeat(1000));
        for pw in ["", "secret", "pässwörd🙂", long.as_str()] {
            let encoded = hash_with(pw, &CHEAP).unwrap();
            assert!(verify(&encoded, pw).unwrap(), "password {pw:?} did not verify");
        }
    }

    #[test]
    fn rejects_different_password() {
        let encoded = hash_with("secret", &CHEAP).unwrap();
        assert!(!verify(&encoded, "Secret").unwrap());
        assert!(!verify(&encoded, "secret ").unwrap());
        assert!(!verify(&encoded, "").unwrap());
    }

    #[test]
    fn every_hash_gets_a_fresh_salt() {
        let a = decode(&hash_with("same", &CHEAP).unwrap()).unwrap();
        let b = decode(&hash_with("same", &CHEAP).unwrap()).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn verifies_reference_hashes() {
        assert!(verify(REFERENCE_DEFAULT, "secret").unwrap());
        assert!(verify(REFERENCE_CHEAP, "secret").unwrap());
        assert!(!verify(REFERENCE_CHEAP, "secreT").unwrap());
        assert!(verify(REFERENCE_UNICODE, "pässwörd🙂").unwrap());
    }

    #[test]
    fn stored_parameters_drive_verification() {
        // Non-default costs and a 16-byte digest must still verify.
        let decoded = decode(REFERENCE_UNICODE).unwrap();
        assert_eq!(
            (decoded.memory_cost, decoded.time_cost, decoded.parallelism),
            (32, 1, 2)
        );
        assert_eq!(decoded.key_length(), 16);
        assert!(needs_rehash(REFERENCE_UNICODE, &HashingParams::DEFAULT).unwrap());
    }

    #[test]
    fn digest_depends_on_every_cost_parameter() {
        let base = Argon2Parameters {
            time_cost: 1,
            memory_cost: 64,
            parallelism: 1,
            salt: b"edge_case_testing_salt".to_vec(),
            digest: vec![0u8; 32],
        };
        let reference = base.derive(b"test_password").unwrap();

        let variants = [
            Argon2Parameters { time_cost: 2, ..base.clone() },
            Argon2Parameters { memory_cost: 72, ..base.clone() },
            Argon2Parameters { parallelism: 2, ..base.clone() },
        ];
        for v in variants {
            assert_ne!(v.derive(b"test_password").unwrap(), reference);
        }
        assert_eq!(base.derive(b"test_password").unwrap(), reference);
    }

    #[test]
    fn rejects_wrong_field_count() {
        for bad in [
            "",
            "argon2id",
            "$argon2id$v=19$m=64,t=1,p=1$d21zLXN0YXRpYy1zYWx0IQ",
            "$argon2id$v=19$m=64,t=1,p=1$d21zLXN0YXRpYy1zYWx0IQ$AAAA$extra",
        ] {
            assert!(
                matches!(decode(bad), Err(CredentialFormatError::FieldCount(_))),
                "{bad:?} was accepted"
            );
        }
    }

    #[test]
    fn rejects_missing_leading_delimiter() {
        let shifted = format!("x{}", REFERENCE_CHEAP);
        assert_eq!(decode(&shifted), Err(CredentialFormatError::MissingLeadingDelimiter));
    }

    #[test]
    fn rejects_empty_fields() {
        let err = decode("$argon2id$v=19$$d21zLXN0YXRpYy1zYWx0IQ$AAAA").unwrap_err();
        assert_eq!(err, CredentialFormatError::EmptyField(3));
    }

    #[test]
    fn rejects_other_algorithms() {
        for tag in ["argon2i", "argon2d", "argon2idx", "bcrypt"] {
            let encoded = REFERENCE_CHEAP.replacen("argon2id", tag, 1);
            assert_eq!(
                decode(&encoded),
                Err(CredentialFormatError::UnsupportedAlgorithm(tag.to_string()))
            );
        }
    }

    #[test]
    fn rejects_unknown_versions() {
        let encoded = REFERENCE_CHEAP.replacen("v=19", "v=16", 1);
        assert_eq!(decode(&encoded), Err(CredentialFormatError::UnsupportedVersion(16)));

        let encoded = REFERENCE_CHEAP.replacen("v=19", "version19", 1);
        assert!(matches!(decode(&encoded), Err(CredentialFormatError::MalformedVersion(_))));
    }

    #[test]
    fn version_must_be_canonical_decimal() {
        for version in ["v=+19", "v=019", "v= 19", "v=19 ", "v=0x13", "v="] {
            let encoded = REFERENCE_CHEAP.replacen("v=19", version, 1);
            assert!(
                matches!(decode(&encoded), Err(CredentialFormatError::MalformedVersion(_))),
                "{version:?} was accepted"
            );
        }
    }

    #[test]
    fn rejects_malformed_cost_field() {
        for costs in [
            "m=64,t=1",
            "t=1,m=64,p=1",
            "m=64,t=1,p=1,x=2",
            "m=x,t=1,p=1",
            "m=-64,t=1,p=1",
            "m=64;t=1;p=1",
            "m=,t=1,p=1",
            "m=+64,t=1,p=1",
            "m=064,t=1,p=1",
            "m=64,t=01,p=1",
            "m=64,t=1,p=001",
        ] {
            let encoded = REFERENCE_CHEAP.replacen("m=64,t=1,p=1", costs, 1);
            assert!(
                matches!(decode(&encoded), Err(CredentialFormatError::MalformedParameters(_))),
                "{costs:?} was accepted"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_costs() {
        let encoded = REFERENCE_CHEAP.replacen("t=1", "t=0", 1);
        assert!(matches!(decode(&encoded), Err(CredentialFormatError::InvalidParameters(_))));
    }

    #[test]
    fn invalid_hashing_params_surface_the_argon2_error() {
        let params = HashingParams {
            memory_cost: 1,
            ..CHEAP
        };
        let err = hash_with("secret", &params).unwrap_err();
        assert!(matches!(err, HashError::Derivation(_)));

        let err: &dyn std::error::Error = &err;
        assert!(err.source().is_some());
    }

    #[test]
    fn rejects_bad_base64() {
        let padded = REFERENCE_CHEAP.replacen("d21zLXN0YXRpYy1zYWx0IQ", "d21zLXN0YXRpYy1zYWx0IQ==", 1);
        assert!(matches!(
            decode(&padded),
            Err(CredentialFormatError::Base64 { field: "salt", .. })
        ));

        let garbage = format!("{}!!", REFERENCE_CHEAP);
        assert!(matches!(
            decode(&garbage),
            Err(CredentialFormatError::Base64 { field: "hash", .. })
        ));
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify("not-a-hash", "secret").is_err());
        assert!(verify("$argon2i$v=19$m=64,t=1,p=1$AAAAAAAAAAA$AAAAAAAAAAA", "secret").is_err());
    }

    #[test]
    fn tampered_digest_fails_at_any_position() {
        let decoded = decode(REFERENCE_CHEAP).unwrap();
        for idx in [0, decoded.digest.len() / 2, decoded.digest.len() - 1] {
            let mut tampered = decoded.clone();
            tampered.digest[idx] ^= 0x01;
            assert!(!verify(&tampered.encode(), "secret").unwrap());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn decode_inverts_encode(
            parallelism in 1u32..=16,
            extra_memory in 0u32..4096,
            time_cost in 1u32..=10,
            salt in proptest::collection::vec(any::<u8>(), 8..64),
            digest in proptest::collection::vec(any::<u8>(), 4..64),
        ) {
            let params = Argon2Parameters {
                time_cost,
                memory_cost: 8 * parallelism + extra_memory,
                parallelism,
                salt,
                digest,
            };
            prop_assert_eq!(decode(&params.encode()).unwrap(), params);
        }
    }
}
