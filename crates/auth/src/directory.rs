//! Read-only view of the account store used during login.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use wms_core::AccountId;

use crate::Role;

/// The account fields authentication needs. Never mutated by this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountCredentialRecord {
    pub id: AccountId,
    pub username: String,
    /// Encoded Argon2id hash (`$argon2id$v=19$...`).
    pub stored_hash: String,
    pub role: Role,
    pub active: bool,
}

impl core::fmt::Debug for AccountCredentialRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountCredentialRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("stored_hash", &"<redacted>")
            .field("role", &self.role)
            .field("active", &self.active)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("account directory unavailable: {0}")]
    Unavailable(String),

    #[error("malformed account row: {0}")]
    MalformedRow(String),
}

/// Account lookup contract implemented by the storage layer.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Every row with this username; zero, one, or (corrupt store) several.
    async fn find_by_username(&self, username: &str) -> Result<Vec<AccountCredentialRecord>, DirectoryError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<AccountCredentialRecord>, DirectoryError>;
}

#[async_trait]
impl<D> AccountDirectory for Arc<D>
where
    D: AccountDirectory + ?Sized,
{
    async fn find_by_username(&self, username: &str) -> Result<Vec<AccountCredentialRecord>, DirectoryError> {
        (**self).find_by_username(username).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<AccountCredentialRecord>, DirectoryError> {
        (**self).find_by_id(id).await
    }
}
