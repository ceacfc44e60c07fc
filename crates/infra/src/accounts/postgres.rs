//! Postgres-backed account directory.
//!
//! Reads the `account` table with raw parameterized SQL. Only the columns
//! authentication needs are selected.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use wms_auth::{AccountCredentialRecord, AccountDirectory, DirectoryError, Role};
use wms_core::AccountId;

const SELECT_BY_USERNAME: &str =
    "SELECT id, username, password, role::text AS role, active FROM account WHERE username = $1";
const SELECT_BY_ID: &str =
    "SELECT id, username, password, role::text AS role, active FROM account WHERE id = $1";

/// Postgres-backed account directory.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync`; clones share it.
#[derive(Debug, Clone)]
pub struct PostgresAccountDirectory {
    pool: Arc<PgPool>,
}

impl PostgresAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, DirectoryError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

fn unavailable(e: sqlx::Error) -> DirectoryError {
    DirectoryError::Unavailable(e.to_string())
}

fn record_from_row(row: &PgRow) -> Result<AccountCredentialRecord, DirectoryError> {
    let malformed = |e: sqlx::Error| DirectoryError::MalformedRow(e.to_string());
    record_from_parts(
        row.try_get("id").map_err(malformed)?,
        row.try_get("username").map_err(malformed)?,
        row.try_get("password").map_err(malformed)?,
        row.try_get("role").map_err(malformed)?,
        row.try_get("active").map_err(malformed)?,
    )
}

fn record_from_parts(
    id: i64,
    username: String,
    stored_hash: String,
    role: String,
    active: bool,
) -> Result<AccountCredentialRecord, DirectoryError> {
    let role = role
        .parse::<Role>()
        .map_err(|e| DirectoryError::MalformedRow(format!("account {id}: {e}")))?;
    Ok(AccountCredentialRecord {
        id: AccountId::new(id),
        username,
        stored_hash,
        role,
        active,
    })
}

#[async_trait]
impl AccountDirectory for PostgresAccountDirectory {
    #[tracing::instrument(skip(self), fields(operation = "find_account_by_username"))]
    async fn find_by_username(&self, username: &str) -> Result<Vec<AccountCredentialRecord>, DirectoryError> {
        let rows = sqlx::query(SELECT_BY_USERNAME)
            .bind(username)
            .fetch_all(&*self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter().map(record_from_row).collect()
    }

    #[tracing::instrument(skip(self), fields(operation = "find_account_by_id"))]
    async fn find_by_id(&self, id: AccountId) -> Result<Option<AccountCredentialRecord>, DirectoryError> {
        let row = sqlx::query(SELECT_BY_ID)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(unavailable)?;

        row.as_ref().map(record_from_row).transpose()
    }
}
