//! SQLite row types and their conversion into domain values.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;

use banking_types::{
    IntentState, OperationKind, Owner, OwnerId, RepoError, TransactionIntent, TxnIdentifier,
    WrappedKey,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Owner row from database.
#[derive(FromRow)]
pub struct DbOwner {
    pub id: String,
    pub label: String,
    pub token_hash: String,
    pub is_active: i64,
    pub created_at: String,
}

/// Wrapped key row from database.
#[derive(FromRow)]
pub struct DbWrappedKey {
    pub owner_id: String,
    pub wrapped: String,
    pub key_version: i64,
    pub created_at: String,
}

/// Intent row from database. `state` holds the JSON-encoded [`IntentState`].
#[derive(FromRow)]
pub struct DbIntent {
    pub identifier: String,
    pub owner_id: String,
    pub operation_kind: String,
    pub payload_digest: String,
    pub state: String,
    pub otp_attempts: i64,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
    pub expires_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-width UTC timestamp, so that string order matches time order.
pub fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

pub fn parse_owner_id(s: &str) -> Result<OwnerId, RepoError> {
    s.parse::<OwnerId>()
        .map_err(|e| RepoError::Database(e.to_string()))
}

fn to_u32(field: &str, value: i64) -> Result<u32, RepoError> {
    u32::try_from(value)
        .map_err(|_| RepoError::Database(format!("{} out of range: {}", field, value)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbOwner {
    pub fn into_domain(self) -> Result<Owner, RepoError> {
        Ok(Owner::from_parts(
            parse_owner_id(&self.id)?,
            self.label,
            self.token_hash,
            self.is_active != 0,
            parse_ts(&self.created_at)?,
        ))
    }
}

impl DbWrappedKey {
    pub fn into_domain(self) -> Result<WrappedKey, RepoError> {
        Ok(WrappedKey {
            owner_id: parse_owner_id(&self.owner_id)?,
            wrapped: self.wrapped,
            key_version: to_u32("key_version", self.key_version)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

impl DbIntent {
    pub fn into_domain(self) -> Result<TransactionIntent, RepoError> {
        let identifier = TxnIdentifier::parse(&self.identifier)?;
        let operation_kind = self.operation_kind.parse::<OperationKind>()?;
        let state: IntentState =
            serde_json::from_str(&self.state).map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(TransactionIntent::from_parts(
            identifier,
            parse_owner_id(&self.owner_id)?,
            operation_kind,
            self.payload_digest,
            state,
            to_u32("otp_attempts", self.otp_attempts)?,
            self.version,
            parse_ts(&self.created_at)?,
            parse_ts(&self.updated_at)?,
            parse_ts(&self.expires_at)?,
        ))
    }
}
