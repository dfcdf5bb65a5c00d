//! # Banking Repository
//!
//! Concrete adapters for the banking middleware:
//! - repositories implementing `OwnerRepository` + `IntentRepository`
//!   (in-memory behind `memory`, SQLite behind `sqlite`)
//! - the HTTP gateway client implementing `ExternalGateway`
//! - the background sweeper that purges stale intents

#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use async_trait::async_trait;
use banking_types::{
    IntentRepository, Owner, OwnerId, OwnerRepository, RepoError, TransactionIntent,
    TxnIdentifier, WrappedKey,
};
use chrono::{DateTime, Utc};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
mod types;

pub mod gateway;
pub mod security;
pub mod sweeper;


#[cfg(feature = "memory")]
pub use memory::MemoryRepo;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepo;

/// Repository selected at startup from the database URL.
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(MemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteRepo),
}

/// Build and initialize a repository from a database URL.
///
/// ```ignore
/// // In-memory (with `memory` feature)
/// let repo = build_repo("memory://").await?;
///
/// // SQLite (with `sqlite` feature)
/// let repo = build_repo("sqlite://banking.db?mode=rwc").await?;
/// ```
pub async fn build_repo(database_url: &str) -> anyhow::Result<Repo> {
    Repo::new(database_url).await
}

impl Repo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        if database_url.starts_with("memory:") {
            #[cfg(feature = "memory")]
            return Ok(Repo::Memory(MemoryRepo::new()));
            #[cfg(not(feature = "memory"))]
            anyhow::bail!("memory repository requested but the `memory` feature is disabled");
        }

        if database_url.starts_with("sqlite:") {
            #[cfg(feature = "sqlite")]
            return Ok(Repo::Sqlite(SqliteRepo::new(database_url).await?));
            #[cfg(not(feature = "sqlite"))]
            anyhow::bail!("sqlite repository requested but the `sqlite` feature is disabled");
        }

        anyhow::bail!("Unsupported DATABASE_URL scheme: {}", database_url)
    }

    pub fn backend(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(_) => "sqlite",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Implement the repository ports for Repo (delegation)
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! delegate {
    ($self:ident, $inner:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($inner) => $call,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($inner) => $call,
        }
    };
}

#[async_trait]
impl OwnerRepository for Repo {
    async fn create_owner(&self, owner: Owner, key: WrappedKey) -> Result<Owner, RepoError> {
        delegate!(self, r => r.create_owner(owner, key).await)
    }

    async fn find_owner_by_token_hash(&self, token_hash: &str) -> Result<Option<Owner>, RepoError> {
        delegate!(self, r => r.find_owner_by_token_hash(token_hash).await)
    }

    async fn get_owner(&self, id: OwnerId) -> Result<Option<Owner>, RepoError> {
        delegate!(self, r => r.get_owner(id).await)
    }

    async fn get_wrapped_key(&self, owner_id: OwnerId) -> Result<Option<WrappedKey>, RepoError> {
        delegate!(self, r => r.get_wrapped_key(owner_id).await)
    }

    async fn replace_wrapped_key(&self, key: WrappedKey) -> Result<(), RepoError> {
        delegate!(self, r => r.replace_wrapped_key(key).await)
    }
}

#[async_trait]
impl IntentRepository for Repo {
    async fn insert_intent(&self, intent: &TransactionIntent) -> Result<(), RepoError> {
        delegate!(self, r => r.insert_intent(intent).await)
    }

    async fn get_intent(
        &self,
        identifier: &TxnIdentifier,
    ) -> Result<Option<TransactionIntent>, RepoError> {
        delegate!(self, r => r.get_intent(identifier).await)
    }

    async fn update_intent(&self, intent: &mut TransactionIntent) -> Result<(), RepoError> {
        delegate!(self, r => r.update_intent(intent).await)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        delegate!(self, r => r.purge_expired(cutoff).await)
    }
}
