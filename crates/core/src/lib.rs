//! `wms-core`: primitives shared by every warehouse crate.
//!
//! No infrastructure concerns live here.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::AccountId;
