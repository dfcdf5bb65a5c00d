//! SQLite repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use banking_types::{
    IntentRepository, Owner, OwnerId, OwnerRepository, RepoError, TransactionIntent,
    TxnIdentifier, WrappedKey,
};

use crate::types::{DbIntent, DbOwner, DbWrappedKey, format_ts};

const MIGRATIONS: [&str; 2] = [
    include_str!("../migrations/0001_create_owners.sql"),
    include_str!("../migrations/0002_create_intents.sql"),
];

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Ensure on-disk SQLite target directory exists.
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if !in_memory {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens a separate database.
        let max_connections = if in_memory { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema. Idempotent.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        for ddl in MIGRATIONS {
            sqlx::raw_sql(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
        }
        Ok(())
    }
}

fn map_write_err(err: sqlx::Error, conflict: impl FnOnce() -> String) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(conflict()),
        _ => RepoError::Database(err.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Owners
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl OwnerRepository for SqliteRepo {
    async fn create_owner(&self, owner: Owner, key: WrappedKey) -> Result<Owner, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO owners (id, label, token_hash, is_active, created_at) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(owner.id.to_string())
        .bind(&owner.label)
        .bind(&owner.token_hash)
        .bind(owner.is_active as i64)
        .bind(format_ts(owner.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_err(e, || "session token already registered".into()))?;

        sqlx::query(
            r#"INSERT INTO owner_keys (owner_id, wrapped, key_version, created_at) VALUES (?, ?, ?, ?)"#,
        )
        .bind(key.owner_id.to_string())
        .bind(&key.wrapped)
        .bind(key.key_version as i64)
        .bind(format_ts(key.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(owner)
    }

    async fn find_owner_by_token_hash(&self, token_hash: &str) -> Result<Option<Owner>, RepoError> {
        let row: Option<DbOwner> = sqlx::query_as(
            r#"SELECT id, label, token_hash, is_active, created_at FROM owners WHERE token_hash = ? AND is_active = 1"#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbOwner::into_domain).transpose()
    }

    async fn get_owner(&self, id: OwnerId) -> Result<Option<Owner>, RepoError> {
        let row: Option<DbOwner> = sqlx::query_as(
            r#"SELECT id, label, token_hash, is_active, created_at FROM owners WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbOwner::into_domain).transpose()
    }

    async fn get_wrapped_key(&self, owner_id: OwnerId) -> Result<Option<WrappedKey>, RepoError> {
        let row: Option<DbWrappedKey> = sqlx::query_as(
            r#"SELECT owner_id, wrapped, key_version, created_at FROM owner_keys WHERE owner_id = ?"#,
        )
        .bind(owner_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbWrappedKey::into_domain).transpose()
    }

    async fn replace_wrapped_key(&self, key: WrappedKey) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE owner_keys SET wrapped = ?, key_version = ?, created_at = ? WHERE owner_id = ?"#,
        )
        .bind(&key.wrapped)
        .bind(key.key_version as i64)
        .bind(format_ts(key.created_at))
        .bind(key.owner_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Intents
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl IntentRepository for SqliteRepo {
    async fn insert_intent(&self, intent: &TransactionIntent) -> Result<(), RepoError> {
        let state =
            serde_json::to_string(&intent.state).map_err(|e| RepoError::Database(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO intents (identifier, owner_id, operation_kind, payload_digest, state, otp_attempts, version, created_at, updated_at, expires_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(intent.identifier.as_str())
        .bind(intent.owner_id.to_string())
        .bind(intent.operation_kind.as_str())
        .bind(&intent.payload_digest)
        .bind(state)
        .bind(intent.otp_attempts as i64)
        .bind(intent.version)
        .bind(format_ts(intent.created_at))
        .bind(format_ts(intent.updated_at))
        .bind(format_ts(intent.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_err(e, || {
                format!("txn_identifier {} is already in use", intent.identifier)
            })
        })?;

        Ok(())
    }

    async fn get_intent(
        &self,
        identifier: &TxnIdentifier,
    ) -> Result<Option<TransactionIntent>, RepoError> {
        let row: Option<DbIntent> = sqlx::query_as(
            r#"SELECT identifier, owner_id, operation_kind, payload_digest, state, otp_attempts, version, created_at, updated_at, expires_at
               FROM intents WHERE identifier = ?"#,
        )
        .bind(identifier.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbIntent::into_domain).transpose()
    }

    async fn update_intent(&self, intent: &mut TransactionIntent) -> Result<(), RepoError> {
        let state =
            serde_json::to_string(&intent.state).map_err(|e| RepoError::Database(e.to_string()))?;

        let result = sqlx::query(
            r#"UPDATE intents
               SET state = ?, otp_attempts = ?, version = version + 1, updated_at = ?, expires_at = ?
               WHERE identifier = ? AND version = ?"#,
        )
        .bind(state)
        .bind(intent.otp_attempts as i64)
        .bind(format_ts(intent.updated_at))
        .bind(format_ts(intent.expires_at))
        .bind(intent.identifier.as_str())
        .bind(intent.version)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.get_intent(&intent.identifier).await? {
                Some(_) => Err(RepoError::Conflict(format!(
                    "txn_identifier {} was modified concurrently",
                    intent.identifier
                ))),
                None => Err(RepoError::NotFound),
            };
        }

        intent.version += 1;
        Ok(())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM intents WHERE expires_at < ?"#)
            .bind(format_ts(cutoff))
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
