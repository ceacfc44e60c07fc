//! Request/response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};

use wms_auth::{AccountCredentialRecord, Role};
use wms_core::AccountId;

/// Login form. Accepted as `application/x-www-form-urlencoded` or JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Public view of an account; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub username: String,
    pub role: Role,
    pub active: bool,
}

impl From<AccountCredentialRecord> for AccountProfile {
    fn from(record: AccountCredentialRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            role: record.role,
            active: record.active,
        }
    }
}
