//! Startup wiring: keys, account directory, authenticator.

use std::sync::Arc;

use thiserror::Error;

use wms_auth::{
    AccountDirectory, Authenticator, DirectoryError, JwtValidator, KeyError, KeyManager, LoginSettings,
    Rs256JwtValidator, TokenIssuer, TokenPolicy,
};
use wms_infra::{InMemoryAccountDirectory, PostgresAccountDirectory};

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("signing key unavailable: {0}")]
    SigningKey(#[source] KeyError),

    #[error("verification key unavailable: {0}")]
    VerifyingKey(#[source] KeyError),

    #[error("account directory unavailable: {0}")]
    Directory(#[from] DirectoryError),
}

/// Shared handles the router hands to handlers and middleware.
#[derive(Clone)]
pub struct AppServices {
    pub authenticator: Arc<Authenticator>,
    pub jwt: Arc<dyn JwtValidator>,
}

impl AppServices {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        keys: Arc<KeyManager>,
        policy: TokenPolicy,
        login: LoginSettings,
    ) -> Self {
        let jwt: Arc<dyn JwtValidator> = Arc::new(Rs256JwtValidator::new(keys.clone(), policy.issuer.clone()));
        let issuer = TokenIssuer::new(keys, policy);
        Self {
            authenticator: Arc::new(Authenticator::new(directory, issuer, login)),
            jwt,
        }
    }
}

/// Load both keys and connect the directory. Any failure stops startup.
pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StartupError> {
    let keys = Arc::new(KeyManager::new(config.signing_key.clone(), config.verifying_key.clone()));
    keys.preload_signing_key().map_err(StartupError::SigningKey)?;
    keys.verifying_key().map_err(StartupError::VerifyingKey)?;

    let directory: Arc<dyn AccountDirectory> = match &config.database_url {
        Some(url) => Arc::new(PostgresAccountDirectory::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set; using an empty in-memory account directory");
            Arc::new(InMemoryAccountDirectory::new())
        }
    };

    Ok(AppServices::new(
        directory,
        keys,
        config.token_policy.clone(),
        config.login,
    ))
}
