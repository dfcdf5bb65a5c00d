//! Owner domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Unique identifier for an Owner (the authenticated app user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Creates a new random OwnerId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an OwnerId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A provisioned owner.
///
/// The session token itself is never stored; only its SHA-256 hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub label: String,
    pub token_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Owner {
    /// Creates a new active owner.
    ///
    /// # Validation
    /// - Label cannot be empty
    pub fn new(label: String, token_hash: String) -> Result<Self, DomainError> {
        if label.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Owner label cannot be empty".into(),
            ));
        }

        Ok(Self {
            id: OwnerId::new(),
            label,
            token_hash,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs an owner from stored fields.
    pub fn from_parts(
        id: OwnerId,
        label: String,
        token_hash: String,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            label,
            token_hash,
            is_active,
            created_at,
        }
    }
}
