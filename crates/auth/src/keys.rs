//! RSA key material for session tokens.
//!
//! Private keys are accepted as PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8
//! (`PRIVATE KEY`) PEM blocks; public keys as PKIX (`PUBLIC KEY`) blocks.
//! Anything that is not RSA is rejected.
//!
//! [`KeyManager`] loads each key at most once per process. Key bytes are
//! immutable after load, so the parsed keys are shared without locking.

use std::path::{Path, PathBuf};

use jsonwebtoken::{DecodingKey, EncodingKey};
use once_cell::sync::OnceCell;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, ObjectIdentifier, PrivateKeyInfo, SubjectPublicKeyInfoRef};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

/// `rsaEncryption` (PKCS#1).
const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

const PKCS1_PRIVATE_TAG: &str = "RSA PRIVATE KEY";
const PKCS8_PRIVATE_TAG: &str = "PRIVATE KEY";
const PKIX_PUBLIC_TAG: &str = "PUBLIC KEY";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("error reading key file at {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key block undecodable: {0}")]
    Undecodable(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("no key path configured")]
    NotConfigured,
}

/// Parse a PEM-encoded RSA private key (PKCS#1 or PKCS#8).
///
/// Only the first PEM block is considered.
pub fn parse_private_key_pem(bytes: &[u8]) -> Result<RsaPrivateKey, KeyError> {
    let block = pem::parse(bytes).map_err(|e| KeyError::Undecodable(e.to_string()))?;

    match block.tag() {
        PKCS1_PRIVATE_TAG => RsaPrivateKey::from_pkcs1_der(block.contents())
            .map_err(|e| KeyError::Undecodable(format!("error parsing PKCS#1 private key: {e}"))),
        PKCS8_PRIVATE_TAG => {
            let info = PrivateKeyInfo::try_from(block.contents())
                .map_err(|e| KeyError::Undecodable(format!("error parsing PKCS#8 private key: {e}")))?;
            if info.algorithm.oid != RSA_ENCRYPTION {
                return Err(KeyError::UnsupportedKeyType(format!(
                    "PKCS#8 key with algorithm {} is not an RSA private key",
                    info.algorithm.oid
                )));
            }
            RsaPrivateKey::from_pkcs8_der(block.contents())
                .map_err(|e| KeyError::Undecodable(format!("error parsing PKCS#8 private key: {e}")))
        }
        other => Err(KeyError::UnsupportedKeyType(format!("PEM block '{other}'"))),
    }
}

/// Parse a PEM-encoded PKIX RSA public key.
pub fn parse_public_key_pem(bytes: &[u8]) -> Result<RsaPublicKey, KeyError> {
    let block = pem::parse(bytes)
        .map_err(|e| KeyError::Undecodable(format!("failed to decode public key: {e}")))?;
    if block.tag() != PKIX_PUBLIC_TAG {
        return Err(KeyError::Undecodable(format!(
            "failed to decode public key: unexpected PEM block '{}'",
            block.tag()
        )));
    }

    let info = SubjectPublicKeyInfoRef::try_from(block.contents())
        .map_err(|e| KeyError::Undecodable(format!("failed to parse public key: {e}")))?;
    if info.algorithm.oid != RSA_ENCRYPTION {
        return Err(KeyError::UnsupportedKeyType(format!(
            "public key with algorithm {} is not an RSA public key",
            info.algorithm.oid
        )));
    }

    RsaPublicKey::from_public_key_der(block.contents())
        .map_err(|e| KeyError::Undecodable(format!("failed to parse public key: {e}")))
}

fn read_key_file(path: &Path) -> Result<Vec<u8>, KeyError> {
    std::fs::read(path).map_err(|source| KeyError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey, KeyError> {
    parse_private_key_pem(&read_key_file(path)?)
}

pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, KeyError> {
    parse_public_key_pem(&read_key_file(path)?)
}

/// RSA private key plus the `jsonwebtoken` handle derived from it.
#[derive(Clone)]
pub struct SigningKey {
    key: RsaPrivateKey,
    encoding: EncodingKey,
}

impl SigningKey {
    pub fn from_rsa(key: RsaPrivateKey) -> Result<Self, KeyError> {
        let der = key
            .to_pkcs1_der()
            .map_err(|e| KeyError::Undecodable(format!("error re-encoding private key: {e}")))?;
        let encoding = EncodingKey::from_rsa_der(der.as_bytes());
        Ok(Self { key, encoding })
    }

    pub fn from_pem(bytes: &[u8]) -> Result<Self, KeyError> {
        Self::from_rsa(parse_private_key_pem(bytes)?)
    }

    pub fn rsa(&self) -> &RsaPrivateKey {
        &self.key
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    /// Public half of this key, for deployments that only ship one PEM.
    pub fn verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        VerifyingKey::from_rsa(RsaPublicKey::from(&self.key))
    }
}

impl core::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigningKey")
            .field("bits", &(self.key.size() * 8))
            .finish_non_exhaustive()
    }
}

/// RSA public key plus the `jsonwebtoken` handle derived from it.
#[derive(Clone)]
pub struct VerifyingKey {
    key: RsaPublicKey,
    decoding: DecodingKey,
}

impl VerifyingKey {
    pub fn from_rsa(key: RsaPublicKey) -> Result<Self, KeyError> {
        let der = key
            .to_pkcs1_der()
            .map_err(|e| KeyError::Undecodable(format!("error re-encoding public key: {e}")))?;
        let decoding = DecodingKey::from_rsa_der(der.as_bytes());
        Ok(Self { key, decoding })
    }

    pub fn from_pem(bytes: &[u8]) -> Result<Self, KeyError> {
        Self::from_rsa(parse_public_key_pem(bytes)?)
    }

    pub fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl core::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("bits", &(self.key.size() * 8))
            .finish_non_exhaustive()
    }
}

/// Where a key lives: a primary path and an optional fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySource {
    pub primary: Option<PathBuf>,
    pub fallback: Option<PathBuf>,
}

impl KeySource {
    pub fn new(primary: Option<PathBuf>, fallback: Option<PathBuf>) -> Self {
        Self { primary, fallback }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            primary: Some(path.into()),
            fallback: None,
        }
    }

    /// Try each configured path in order; the last error wins.
    fn load<T>(&self, kind: &str, load: impl Fn(&Path) -> Result<T, KeyError>) -> Result<T, KeyError> {
        let mut last = KeyError::NotConfigured;
        for path in self.primary.iter().chain(self.fallback.iter()) {
            match load(path) {
                Ok(key) => {
                    tracing::info!(path = %path.display(), kind, "loaded key");
                    return Ok(key);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), kind, error = %e, "failed to load key");
                    last = e;
                }
            }
        }
        Err(last)
    }
}

/// Process-wide holder for the signing and verification keys.
///
/// Each key is loaded on first use. Concurrent first callers wait on a
/// single load; a failed load is not remembered, so a later call retries.
#[derive(Debug)]
pub struct KeyManager {
    signing_source: KeySource,
    verifying_source: KeySource,
    signing: OnceCell<SigningKey>,
    verifying: OnceCell<VerifyingKey>,
}

impl KeyManager {
    pub fn new(signing_source: KeySource, verifying_source: KeySource) -> Self {
        Self {
            signing_source,
            verifying_source,
            signing: OnceCell::new(),
            verifying: OnceCell::new(),
        }
    }

    /// Manager over already-parsed keys; never touches the filesystem.
    pub fn from_keys(signing: SigningKey, verifying: VerifyingKey) -> Self {
        Self {
            signing_source: KeySource::default(),
            verifying_source: KeySource::default(),
            signing: OnceCell::with_value(signing),
            verifying: OnceCell::with_value(verifying),
        }
    }

    pub fn signing_key(&self) -> Result<&SigningKey, KeyError> {
        self.signing.get_or_try_init(|| {
            self.signing_source
                .load("private", load_private_key)
                .and_then(SigningKey::from_rsa)
        })
    }

    pub fn verifying_key(&self) -> Result<&VerifyingKey, KeyError> {
        self.verifying.get_or_try_init(|| {
            self.verifying_source
                .load("public", load_public_key)
                .and_then(VerifyingKey::from_rsa)
        })
    }

    /// Load the signing key now so a missing key fails startup.
    pub fn preload_signing_key(&self) -> Result<(), KeyError> {
        self.signing_key().map(|_| ())
    }
}
