//! Contracts with the external user/record store and credential verifier.

pub mod fixture;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::{Principal, PrincipalId, StructuralError};

pub use fixture::{Fixture, FixtureError};
pub use memory::MemoryStore;
pub use postgres::PgPrincipalStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("principal not found: {0}")]
    NotFound(PrincipalId),

    #[error("malformed principal record: {0}")]
    Malformed(#[from] StructuralError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Unknown identifier or wrong secret; the two are never distinguished
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read access to stored principals
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn lookup_principal(&self, id: PrincipalId) -> Result<Principal, StoreError>;

    /// Every principal whose supervisor reference is `id`
    async fn list_by_supervisor(&self, id: PrincipalId) -> Result<Vec<Principal>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Opaque one-way credential check
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, identifier: &str, secret: &str) -> Result<Principal, VerificationError>;
}
