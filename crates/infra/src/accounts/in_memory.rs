use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use async_trait::async_trait;

use wms_auth::{AccountCredentialRecord, AccountDirectory, DirectoryError};
use wms_core::AccountId;

/// In-memory account directory for tests/dev.
///
/// Duplicate usernames are kept as-is so callers can exercise the
/// duplicate-account path.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    inner: RwLock<Vec<AccountCredentialRecord>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = AccountCredentialRecord>) -> Self {
        Self {
            inner: RwLock::new(accounts.into_iter().collect()),
        }
    }

    pub fn insert(&self, account: AccountCredentialRecord) -> Result<(), DirectoryError> {
        self.inner.write().map_err(poisoned)?.push(account);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<AccountCredentialRecord>>, DirectoryError> {
        self.inner.read().map_err(poisoned)
    }
}

fn poisoned<T>(_: PoisonError<T>) -> DirectoryError {
    DirectoryError::Unavailable("in-memory directory lock poisoned".to_string())
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Vec<AccountCredentialRecord>, DirectoryError> {
        Ok(self
            .read()?
            .iter()
            .filter(|a| a.username == username)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<AccountCredentialRecord>, DirectoryError> {
        Ok(self.read()?.iter().find(|a| a.id == id).cloned())
    }
}
