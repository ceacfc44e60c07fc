//! Infrastructure layer: storage adapters behind the auth contracts.

pub mod accounts;

pub use accounts::{InMemoryAccountDirectory, PostgresAccountDirectory};
