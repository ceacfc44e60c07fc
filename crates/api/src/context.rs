use wms_auth::{Role, SessionClaims};
use wms_core::AccountId;

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware once the token has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    claims: SessionClaims,
}

impl PrincipalContext {
    pub fn new(claims: SessionClaims) -> Self {
        Self { claims }
    }

    pub fn account_id(&self) -> AccountId {
        self.claims.subject_id
    }

    pub fn username(&self) -> &str {
        &self.claims.username
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}
