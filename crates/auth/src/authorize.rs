//! Per-request ownership policy.
//!
//! Runs after the request pipeline has verified the token signature and
//! attached [`SessionClaims`]; nothing here touches key material.
//!
//! Only the `accounts` collection is guarded. Other collections have no
//! ownership rule yet and are allowed through.

use thiserror::Error;

use wms_core::AccountId;

use crate::SessionClaims;

const API_PREFIX: &str = "api";
const ACCOUNTS: &str = "accounts";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: account {subject} may not access {path}")]
    Forbidden { subject: AccountId, path: String },
}

/// Resource collection addressed by a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection<'a> {
    Accounts,
    Other(&'a str),
    Root,
}

impl<'a> Collection<'a> {
    /// First path segment after an optional `/api` prefix.
    ///
    /// Matching is per segment: `/api/items/accounts` addresses `items`.
    pub fn of(path: &'a str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let mut segments = path.split('/').filter(|s| !s.is_empty());

        let first = match segments.next() {
            Some(API_PREFIX) => segments.next(),
            other => other,
        };

        match first {
            None => Collection::Root,
            Some(ACCOUNTS) => Collection::Accounts,
            Some(other) => Collection::Other(other),
        }
    }
}

/// Enforce resource ownership for one request.
///
/// On the accounts collection the caller must either own `path_id` or hold
/// the admin role. A request without an id (the collection itself) is
/// admin-only.
pub fn check_ownership(
    claims: &SessionClaims,
    request_path: &str,
    path_id: Option<AccountId>,
) -> Result<(), AuthzError> {
    match Collection::of(request_path) {
        Collection::Accounts => {
            let owns = path_id == Some(claims.subject_id);
            if owns || claims.role.is_admin() {
                Ok(())
            } else {
                tracing::warn!(
                    subject = %claims.subject_id,
                    role = %claims.role,
                    path = request_path,
                    "ownership check denied"
                );
                Err(AuthzError::Forbidden {
                    subject: claims.subject_id,
                    path: request_path.to_string(),
                })
            }
        }
        Collection::Other(_) | Collection::Root => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::{Duration, Utc};

    fn claims(id: i64, role: Role) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            subject_id: AccountId::new(id),
            username: "demo".to_string(),
            role,
            issuer: None,
            issued_at: now,
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn owner_may_access_own_account() {
        let c = claims(66, Role::Customer);
        assert_eq!(check_ownership(&c, "/api/accounts/66", Some(AccountId::new(66))), Ok(()));
    }

    #[test]
    fn non_owner_is_denied() {
        let c = claims(66, Role::Customer);
        let err = check_ownership(&c, "/api/accounts/77", Some(AccountId::new(77))).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                subject: AccountId::new(66),
                path: "/api/accounts/77".to_string(),
            }
        );
    }

    #[test]
    fn admin_may_access_any_account() {
        let c = claims(1, Role::Admin);
        assert!(check_ownership(&c, "/api/accounts/77", Some(AccountId::new(77))).is_ok());
        assert!(check_ownership(&c, "/api/accounts", None).is_ok());
    }

    #[test]
    fn account_collection_is_admin_only() {
        for role in [Role::Manager, Role::Employee, Role::Supplier, Role::Customer] {
            assert!(check_ownership(&claims(66, role), "/api/accounts", None).is_err());
        }
    }

    #[test]
    fn other_collections_are_not_guarded() {
        let c = claims(66, Role::Customer);
        assert!(check_ownership(&c, "/api/items/77", Some(AccountId::new(77))).is_ok());
        assert!(check_ownership(&c, "/api/inventory", None).is_ok());
        assert!(check_ownership(&c, "/health", None).is_ok());
    }

    #[test]
    fn collection_is_matched_by_segment() {
        assert_eq!(Collection::of("/api/accounts/66"), Collection::Accounts);
        assert_eq!(Collection::of("/accounts/66/"), Collection::Accounts);
        assert_eq!(Collection::of("/api/accounts?page=2"), Collection::Accounts);
        assert_eq!(Collection::of("/api/items/accounts"), Collection::Other("items"));
        assert_eq!(Collection::of("/api/accountsx/1"), Collection::Other("accountsx"));
        assert_eq!(Collection::of("/api"), Collection::Root);
        assert_eq!(Collection::of("/"), Collection::Root);
    }
}
