//! Username/password login.
//!
//! `Unauthenticated -> Authenticated` in one step: look the account up,
//! check it is active, verify the password, mint a token. Every credential
//! failure surfaces as the same [`LoginError::InvalidCredentials`] message;
//! the specific [`CredentialFailure`] is kept for logs and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::directory::{AccountCredentialRecord, AccountDirectory, DirectoryError};
use crate::password::{self, HashingParams};
use crate::token::{IssuedToken, TokenError, TokenIssuer};

/// Why a login was refused. Internal detail, never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    UnknownAccount,
    DuplicateAccount(usize),
    Disabled,
    WrongPassword,
    MalformedHash,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials(CredentialFailure),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("login task failed: {0}")]
    Internal(String),
}

impl LoginError {
    pub fn credential_failure(&self) -> Option<CredentialFailure> {
        match self {
            LoginError::InvalidCredentials(cause) => Some(*cause),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginSettings {
    /// Upper bound on Argon2 derivations running at once. Each one holds
    /// `memory_cost` KiB (64 MiB by default) while it runs.
    pub max_concurrent_hashes: usize,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            max_concurrent_hashes: 4,
        }
    }
}

/// Hash verified when no usable account exists, so a rejected login costs
/// the same as a wrong password.
static DUMMY_HASH: OnceCell<String> = OnceCell::new();

const DUMMY_PASSWORD: &str = "wms-dummy-credential";

/// Derivations currently running and the most seen at once.
#[derive(Debug, Default)]
struct HashingLoad {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl HashingLoad {
    fn enter(self: &Arc<Self>) -> InFlight {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlight(self.clone())
    }
}

struct InFlight(Arc<HashingLoad>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Authenticator {
    directory: Arc<dyn AccountDirectory>,
    issuer: TokenIssuer,
    hashing: Arc<Semaphore>,
    load: Arc<HashingLoad>,
}

impl Authenticator {
    pub fn new(directory: Arc<dyn AccountDirectory>, issuer: TokenIssuer, settings: LoginSettings) -> Self {
        Self {
            directory,
            issuer,
            hashing: Arc::new(Semaphore::new(settings.max_concurrent_hashes.max(1))),
            load: Arc::new(HashingLoad::default()),
        }
    }

    /// Highest number of Argon2 derivations this authenticator has run at once.
    pub fn peak_concurrent_hashes(&self) -> usize {
        self.load.peak.load(Ordering::SeqCst)
    }

    pub fn directory(&self) -> &Arc<dyn AccountDirectory> {
        &self.directory
    }

    /// Authenticate and mint a session token.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, LoginError> {
        let account = match self.authenticate(username, password).await {
            Ok(account) => account,
            Err(LoginError::InvalidCredentials(cause)) => {
                tracing::warn!(username, ?cause, "login rejected");
                return Err(LoginError::InvalidCredentials(cause));
            }
            Err(e) => {
                tracing::error!(username, error = %e, "login failed");
                return Err(e);
            }
        };

        let token = self.issuer.issue(&account)?;
        tracing::info!(username, account_id = %account.id, role = %account.role, "login succeeded");
        Ok(token)
    }

    /// Resolve and verify the account without issuing a token.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AccountCredentialRecord, LoginError> {
        let mut accounts = self.directory.find_by_username(username).await?;

        let account = match accounts.len() {
            1 => accounts.remove(0),
            0 => return self.reject(password, CredentialFailure::UnknownAccount).await,
            n => {
                let ids: Vec<i64> = accounts.iter().map(|a| a.id.get()).collect();
                tracing::error!(username, ?ids, "duplicate account entries");
                return self.reject(password, CredentialFailure::DuplicateAccount(n)).await;
            }
        };

        if !account.active {
            return self.reject(password, CredentialFailure::Disabled).await;
        }

        match self.verify(account.stored_hash.clone(), password).await? {
            Ok(true) => {}
            Ok(false) => return Err(LoginError::InvalidCredentials(CredentialFailure::WrongPassword)),
            Err(e) => {
                tracing::error!(account_id = %account.id, error = %e, "stored password hash is malformed");
                return Err(LoginError::InvalidCredentials(CredentialFailure::MalformedHash));
            }
        }

        if password::needs_rehash(&account.stored_hash, &HashingParams::DEFAULT).unwrap_or(false) {
            tracing::info!(account_id = %account.id, "stored password hash uses outdated parameters");
        }

        Ok(account)
    }

    /// Burn one verification against the dummy hash, then refuse.
    ///
    /// The dummy hash is built lazily on the blocking pool under a permit,
    /// like every other derivation.
    async fn reject<T>(&self, password: &str, cause: CredentialFailure) -> Result<T, LoginError> {
        let candidate = password.to_owned();
        let burned = self
            .run_hashing(move || {
                DUMMY_HASH
                    .get_or_try_init(|| password::hash(DUMMY_PASSWORD))
                    .map(|dummy| password::verify(dummy, &candidate))
            })
            .await?;
        if let Err(e) = burned {
            tracing::warn!(error = %e, "could not prepare dummy hash");
        }
        Err(LoginError::InvalidCredentials(cause))
    }

    async fn verify(
        &self,
        stored_hash: String,
        password: &str,
    ) -> Result<Result<bool, password::CredentialFormatError>, LoginError> {
        let candidate = password.to_owned();
        self.run_hashing(move || password::verify(&stored_hash, &candidate))
            .await
    }

    /// Argon2 work on the blocking pool, bounded by the semaphore.
    async fn run_hashing<R, F>(&self, job: F) -> Result<R, LoginError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let _permit = self
            .hashing
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| LoginError::Internal(e.to_string()))?;

        let load = self.load.clone();
        tokio::task::spawn_blocking(move || {
            let _in_flight = load.enter();
            job()
        })
        .await
        .map_err(|e| LoginError::Internal(e.to_string()))
    }
}
