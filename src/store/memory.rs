use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::{CredentialVerifier, PrincipalStore, StoreError, VerificationError};
use crate::identity::{Principal, PrincipalId, PrincipalRecord};

/// Verified against when the identifier is unknown, so both failures cost one hash
static DECOY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_secret("caregate-decoy").ok());

#[derive(Debug, Clone)]
struct StoredPrincipal {
    record: PrincipalRecord,
    /// Argon2id PHC string
    secret: Option<String>,
}

/// In-process principal store for development and tests
///
/// Records are kept in their raw stored shape, so malformed rows can be
/// represented and are only rejected when read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, StoredPrincipal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. Principals without a secret cannot log in.
    pub fn insert(&self, record: PrincipalRecord, secret: Option<&str>) {
        let secret = secret.and_then(|secret| match hash_secret(secret) {
            Ok(hash) => Some(hash),
            Err(err) => {
                tracing::warn!("Failed to hash secret for {}: {}", record.identifier, err);
                None
            }
        });
        let stored = StoredPrincipal { secret, record };
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(stored.record.id, stored);
    }

    pub fn remove(&self, id: PrincipalId) -> bool {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.0)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn lookup_principal(&self, id: PrincipalId) -> Result<Principal, StoreError> {
        let record = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.0)
            .map(|stored| stored.record.clone())
            .ok_or(StoreError::NotFound(id))?;

        Ok(Principal::try_from(record)?)
    }

    async fn list_by_supervisor(&self, id: PrincipalId) -> Result<Vec<Principal>, StoreError> {
        let mut records: Vec<PrincipalRecord> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|stored| stored.record.supervisor_id == Some(id.0))
            .map(|stored| stored.record.clone())
            .collect();
        records.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        records
            .into_iter()
            .map(|record| Principal::try_from(record).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl CredentialVerifier for MemoryStore {
    async fn verify(&self, identifier: &str, secret: &str) -> Result<Principal, VerificationError> {
        let wanted = identifier.trim().to_lowercase();

        let found = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|stored| stored.record.identifier.to_lowercase() == wanted)
            .cloned();

        let Some(stored) = found else {
            if let Some(decoy) = DECOY_HASH.as_deref() {
                verify_secret(secret, decoy);
            }
            return Err(VerificationError::InvalidCredentials);
        };

        match stored.secret.as_deref() {
            Some(hash) if verify_secret(secret, hash) => {
                Ok(Principal::try_from(stored.record).map_err(StoreError::from)?)
            }
            _ => Err(VerificationError::InvalidCredentials),
        }
    }
}

/// Hash a secret with Argon2id into a PHC string carrying its own salt and parameters
fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// False for a wrong secret and for an unparseable stored hash
fn verify_secret(secret: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!("Stored secret is not a valid PHC string: {}", err);
            false
        }
    }
}
