use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{error, info};

use super::{CredentialVerifier, PrincipalStore, StoreError, VerificationError};
use crate::config::DatabaseConfig;
use crate::identity::{Principal, PrincipalId, PrincipalRecord};

const PRINCIPAL_COLUMNS: &str = "id, identifier, role, supervisor_id, professional_id";

/// Principal store backed by the `principals` table
///
/// Secret verification is delegated to pgcrypto's `crypt()`, so password
/// hashes never leave the database.
#[derive(Debug, Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool using the database section of the app config
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let database_url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not configured".to_string()))?;

        let parsed = url::Url::parse(database_url)
            .map_err(|_| StoreError::Unavailable("Invalid database URL".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(database_url)
            .await?;

        info!("Connected principal store to {}", redacted(&parsed));
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn lookup_principal(&self, id: PrincipalId) -> Result<Principal, StoreError> {
        let query = format!(
            "SELECT {} FROM principals WHERE id = $1 AND trashed_at IS NULL AND deleted_at IS NULL",
            PRINCIPAL_COLUMNS
        );

        let record = sqlx::query_as::<_, PrincipalRecord>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(log_sqlx)?
            .ok_or(StoreError::NotFound(id))?;

        Ok(Principal::try_from(record)?)
    }

    async fn list_by_supervisor(&self, id: PrincipalId) -> Result<Vec<Principal>, StoreError> {
        let query = format!(
            "SELECT {} FROM principals \
             WHERE supervisor_id = $1 AND trashed_at IS NULL AND deleted_at IS NULL \
             ORDER BY identifier",
            PRINCIPAL_COLUMNS
        );

        let records = sqlx::query_as::<_, PrincipalRecord>(&query)
            .bind(id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(log_sqlx)?;

        records
            .into_iter()
            .map(|record| Principal::try_from(record).map_err(StoreError::from))
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(log_sqlx)?;
        Ok(())
    }
}

#[async_trait]
impl CredentialVerifier for PgPrincipalStore {
    async fn verify(&self, identifier: &str, secret: &str) -> Result<Principal, VerificationError> {
        let query = format!(
            "SELECT {} FROM principals \
             WHERE lower(identifier) = lower($1) \
             AND password_hash IS NOT NULL \
             AND password_hash = crypt($2, password_hash) \
             AND trashed_at IS NULL AND deleted_at IS NULL",
            PRINCIPAL_COLUMNS
        );

        let record = sqlx::query_as::<_, PrincipalRecord>(&query)
            .bind(identifier.trim())
            .bind(secret)
            .fetch_optional(&self.pool)
            .await
            .map_err(log_sqlx)?
            .ok_or(VerificationError::InvalidCredentials)?;

        Ok(Principal::try_from(record).map_err(StoreError::from)?)
    }
}

fn log_sqlx(err: sqlx::Error) -> StoreError {
    // Log the real error but hand back a generic one
    error!("Principal store query failed: {}", err);
    StoreError::Unavailable("Database error occurred".to_string())
}

fn redacted(url: &url::Url) -> String {
    let mut url = url.clone();
    let _ = url.set_password(None);
    url.to_string()
}
