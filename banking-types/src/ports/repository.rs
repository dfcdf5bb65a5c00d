//! Repository port traits.
//!
//! Adapters (SQLite, in-memory) implement both traits; the service layer
//! depends on [`BankingRepository`].

use chrono::{DateTime, Utc};

use crate::domain::{Owner, OwnerId, TransactionIntent, TxnIdentifier, WrappedKey};
use crate::error::RepoError;

/// Storage of provisioned owners and their wrapped signing keys.
#[async_trait::async_trait]
pub trait OwnerRepository: Send + Sync + 'static {
    /// Stores a new owner together with its first wrapped key.
    async fn create_owner(&self, owner: Owner, key: WrappedKey) -> Result<Owner, RepoError>;

    /// Looks up an active owner by the SHA-256 hash of its session token.
    async fn find_owner_by_token_hash(&self, token_hash: &str) -> Result<Option<Owner>, RepoError>;

    async fn get_owner(&self, id: OwnerId) -> Result<Option<Owner>, RepoError>;

    async fn get_wrapped_key(&self, owner_id: OwnerId) -> Result<Option<WrappedKey>, RepoError>;

    /// Replaces the owner's wrapped key. `RepoError::NotFound` if the owner is unknown.
    async fn replace_wrapped_key(&self, key: WrappedKey) -> Result<(), RepoError>;
}

/// Storage of transaction intents, keyed by identifier.
#[async_trait::async_trait]
pub trait IntentRepository: Send + Sync + 'static {
    /// Inserts a new intent. `RepoError::Conflict` if the identifier already exists.
    async fn insert_intent(&self, intent: &TransactionIntent) -> Result<(), RepoError>;

    async fn get_intent(
        &self,
        identifier: &TxnIdentifier,
    ) -> Result<Option<TransactionIntent>, RepoError>;

    /// Writes back a modified intent.
    ///
    /// Succeeds only if the stored version still equals `intent.version`;
    /// on success the version is bumped in storage and in `intent`.
    /// A stale version yields `RepoError::Conflict`.
    async fn update_intent(&self, intent: &mut TransactionIntent) -> Result<(), RepoError>;

    /// Deletes intents whose deadline is before `cutoff`. Returns the count removed.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError>;
}

/// Everything the service layer needs from storage.
pub trait BankingRepository: OwnerRepository + IntentRepository {}

impl<T: OwnerRepository + IntentRepository> BankingRepository for T {}
