use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wms_core::AccountId;

use crate::directory::AccountCredentialRecord;
use crate::keys::{KeyError, KeyManager};
use crate::Role;

/// Claims carried by a session token.
///
/// Never stored server-side; a token stays valid until its signature or
/// time window check fails. There is no revocation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "id")]
    pub subject_id: AccountId,

    pub username: String,

    pub role: Role,

    #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub fn for_account(account: &AccountCredentialRecord, policy: &TokenPolicy, now: DateTime<Utc>) -> Self {
        Self {
            subject_id: account.id,
            username: account.username.clone(),
            role: account.role,
            issuer: policy.issuer.clone(),
            issued_at: now,
            expires_at: now + policy.ttl,
        }
    }
}

/// Lifetime and issuer stamped on new tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    pub ttl: Duration,
    pub issuer: Option<String>,
}

impl TokenPolicy {
    pub const DEFAULT_TTL_SECS: i64 = 8 * 60 * 60;
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(Self::DEFAULT_TTL_SECS),
            issuer: None,
        }
    }
}

/// Body returned by a successful login: `{"token": "<jwt>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to open JWT key: {0}")]
    Key(#[from] KeyError),

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Mints RS256-signed session tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    keys: Arc<KeyManager>,
    policy: TokenPolicy,
}

impl TokenIssuer {
    pub fn new(keys: Arc<KeyManager>, policy: TokenPolicy) -> Self {
        Self { keys, policy }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    pub fn issue(&self, account: &AccountCredentialRecord) -> Result<IssuedToken, TokenError> {
        self.issue_at(account, Utc::now())
    }

    pub fn issue_at(&self, account: &AccountCredentialRecord, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = SessionClaims::for_account(account, &self.policy, now);
        let key = self.keys.signing_key()?;
        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, key.encoding_key())?;
        Ok(IssuedToken { token })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("verification key unavailable: {0}")]
    KeyUnavailable(String),
}

/// Deterministically validate the claims' time window.
///
/// Signature verification happens before this, in the [`JwtValidator`].
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Turns a compact token into trusted claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError>;
}

/// RS256 verification against the [`KeyManager`] public key.
#[derive(Debug, Clone)]
pub struct Rs256JwtValidator {
    keys: Arc<KeyManager>,
    issuer: Option<String>,
}

impl Rs256JwtValidator {
    pub fn new(keys: Arc<KeyManager>, issuer: Option<String>) -> Self {
        Self { keys, issuer }
    }
}

impl JwtValidator for Rs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError> {
        let key = self
            .keys
            .verifying_key()
            .map_err(|e| TokenValidationError::KeyUnavailable(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        // Time window is checked against the caller's clock below.
        validation.validate_exp = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = jsonwebtoken::decode::<SessionClaims>(token, key.decoding_key(), &validation)
            .map_err(|e| TokenValidationError::Invalid(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
