//! Process configuration read from the environment.

use std::path::PathBuf;

use thiserror::Error;

use wms_auth::{KeySource, LoginSettings, TokenPolicy};

pub const BIND_ADDR_ENV: &str = "WMS_BIND_ADDR";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const SIGNING_KEY_ENV: &str = "JWTKEY";
pub const VERIFYING_KEY_ENV: &str = "JWTPUBKEY";
pub const TOKEN_TTL_ENV: &str = "WMS_TOKEN_TTL_SECS";
pub const TOKEN_ISSUER_ENV: &str = "WMS_TOKEN_ISSUER";
pub const MAX_CONCURRENT_HASHES_ENV: &str = "WMS_MAX_CONCURRENT_HASHES";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1323";
const FALLBACK_SIGNING_KEY: &str = "../wms-jwt.pem";
const FALLBACK_VERIFYING_KEY: &str = "../wms-jwt-pub.pem";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    /// Without a database the server runs against an empty in-memory directory.
    pub database_url: Option<String>,
    pub signing_key: KeySource,
    pub verifying_key: KeySource,
    pub token_policy: TokenPolicy,
    pub login: LoginSettings,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ttl_secs = match get(TOKEN_TTL_ENV) {
            Some(raw) => parse_positive(TOKEN_TTL_ENV, &raw)?,
            None => TokenPolicy::DEFAULT_TTL_SECS,
        };

        let max_concurrent_hashes = match get(MAX_CONCURRENT_HASHES_ENV) {
            Some(raw) => parse_positive(MAX_CONCURRENT_HASHES_ENV, &raw)? as usize,
            None => LoginSettings::default().max_concurrent_hashes,
        };

        Ok(Self {
            bind_addr: get(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: get(DATABASE_URL_ENV),
            signing_key: KeySource::new(
                get(SIGNING_KEY_ENV).map(PathBuf::from),
                Some(PathBuf::from(FALLBACK_SIGNING_KEY)),
            ),
            verifying_key: KeySource::new(
                get(VERIFYING_KEY_ENV).map(PathBuf::from),
                Some(PathBuf::from(FALLBACK_VERIFYING_KEY)),
            ),
            token_policy: TokenPolicy {
                ttl: chrono::Duration::seconds(ttl_secs),
                issuer: get(TOKEN_ISSUER_ENV),
            },
            login: LoginSettings { max_concurrent_hashes },
        })
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<i64, ConfigError> {
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
