//! In-memory repository adapter.
//!
//! Process-local and lost on restart. Used for development and tests.

use async_trait::async_trait;
use banking_types::{
    IntentRepository, Owner, OwnerId, OwnerRepository, RepoError, TransactionIntent,
    TxnIdentifier, WrappedKey,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Default)]
pub struct MemoryRepo {
    owners: DashMap<OwnerId, Owner>,
    owners_by_token: DashMap<String, OwnerId>,
    keys: DashMap<OwnerId, WrappedKey>,
    intents: DashMap<TxnIdentifier, TransactionIntent>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }
}

#[async_trait]
impl OwnerRepository for MemoryRepo {
    async fn create_owner(&self, owner: Owner, key: WrappedKey) -> Result<Owner, RepoError> {
        match self.owners_by_token.entry(owner.token_hash.clone()) {
            Entry::Occupied(_) => {
                return Err(RepoError::Conflict("session token already registered".into()));
            }
            Entry::Vacant(slot) => {
                slot.insert(owner.id);
            }
        }
        self.keys.insert(owner.id, key);
        self.owners.insert(owner.id, owner.clone());
        Ok(owner)
    }

    async fn find_owner_by_token_hash(&self, token_hash: &str) -> Result<Option<Owner>, RepoError> {
        let Some(id) = self.owners_by_token.get(token_hash).map(|r| *r) else {
            return Ok(None);
        };
        Ok(self
            .owners
            .get(&id)
            .filter(|o| o.is_active)
            .map(|o| o.clone()))
    }

    async fn get_owner(&self, id: OwnerId) -> Result<Option<Owner>, RepoError> {
        Ok(self.owners.get(&id).map(|o| o.clone()))
    }

    async fn get_wrapped_key(&self, owner_id: OwnerId) -> Result<Option<WrappedKey>, RepoError> {
        Ok(self.keys.get(&owner_id).map(|k| k.clone()))
    }

    async fn replace_wrapped_key(&self, key: WrappedKey) -> Result<(), RepoError> {
        match self.keys.get_mut(&key.owner_id) {
            Some(mut slot) => {
                *slot = key;
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl IntentRepository for MemoryRepo {
    async fn insert_intent(&self, intent: &TransactionIntent) -> Result<(), RepoError> {
        match self.intents.entry(intent.identifier.clone()) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "txn_identifier {} is already in use",
                intent.identifier
            ))),
            Entry::Vacant(slot) => {
                slot.insert(intent.clone());
                Ok(())
            }
        }
    }

    async fn get_intent(
        &self,
        identifier: &TxnIdentifier,
    ) -> Result<Option<TransactionIntent>, RepoError> {
        Ok(self.intents.get(identifier).map(|i| i.clone()))
    }

    async fn update_intent(&self, intent: &mut TransactionIntent) -> Result<(), RepoError> {
        let mut stored = self
            .intents
            .get_mut(&intent.identifier)
            .ok_or(RepoError::NotFound)?;
        if stored.version != intent.version {
            return Err(RepoError::Conflict(format!(
                "txn_identifier {} was modified concurrently",
                intent.identifier
            )));
        }
        intent.version += 1;
        *stored = intent.clone();
        Ok(())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        let before = self.intents.len();
        self.intents.retain(|_, intent| intent.expires_at >= cutoff);
        Ok(before.saturating_sub(self.intents.len()) as u64)
    }
}
