//! `wms-auth`: credential and session authentication.
//!
//! Decoupled from HTTP and storage: account lookup comes in through
//! [`AccountDirectory`], verified claims come in from the request pipeline.

pub mod authorize;
pub mod directory;
pub mod keys;
pub mod login;
pub mod password;
pub mod roles;
pub mod token;

pub use authorize::{check_ownership, AuthzError, Collection};
pub use directory::{AccountCredentialRecord, AccountDirectory, DirectoryError};
pub use keys::{KeyError, KeyManager, KeySource, SigningKey, VerifyingKey};
pub use login::{Authenticator, CredentialFailure, LoginError, LoginSettings};
pub use password::{Argon2Parameters, CredentialFormatError, HashError, HashingParams};
pub use roles::{Role, UnknownRole};
pub use token::{
    validate_claims, IssuedToken, JwtValidator, Rs256JwtValidator, SessionClaims, TokenError,
    TokenIssuer, TokenPolicy, TokenValidationError,
};
