//! Per-owner signing key.

use chrono::{DateTime, Utc};
use secure_envelope::{EnvelopeError, EnvelopeKey};
use serde::{Deserialize, Serialize};

use super::owner::OwnerId;

/// The active symmetric key of one owner, unwrapped for use.
///
/// The key bytes are zeroized on drop and redacted from `Debug` output.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub owner_id: OwnerId,
    pub key: EnvelopeKey,
    pub key_version: u32,
}

impl KeyMaterial {
    pub fn new(owner_id: OwnerId, key: EnvelopeKey, key_version: u32) -> Self {
        Self {
            owner_id,
            key,
            key_version,
        }
    }

    /// Encrypts a payload for this owner.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, EnvelopeError> {
        self.key.seal(plaintext)
    }

    /// Decrypts a payload sent by this owner.
    pub fn open(&self, envelope: &str) -> Result<Vec<u8>, EnvelopeError> {
        self.key.open(envelope)
    }
}

/// Signing key as stored at rest: an envelope sealed under the master key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedKey {
    pub owner_id: OwnerId,
    pub wrapped: String,
    pub key_version: u32,
    pub created_at: DateTime<Utc>,
}

impl WrappedKey {
    pub fn new(owner_id: OwnerId, wrapped: String, key_version: u32) -> Self {
        Self {
            owner_id,
            wrapped,
            key_version,
            created_at: Utc::now(),
        }
    }
}
