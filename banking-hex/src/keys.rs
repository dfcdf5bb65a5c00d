//! Key material access.
//!
//! Owner signing keys are stored wrapped under the process master key and
//! unwrapped per request. Lookups are keyed by the owner identity the auth
//! middleware established, never by anything inside the request body.

use std::sync::Arc;

use banking_repo::security::{
    generate_session_token, hash_session_token, unwrap_key, verify_session_token, wrap_key,
};
use banking_types::{
    AppError, KeyMaterial, Owner, OwnerId, OwnerRepository, ProvisionedOwner, RotatedKey,
    WrappedKey,
};
use secure_envelope::{EnvelopeKey, KeySize};
use tracing::{error, info, instrument};

pub struct KeyMaterialService<R: OwnerRepository> {
    repo: Arc<R>,
    master: EnvelopeKey,
    key_size: KeySize,
}

impl<R: OwnerRepository> KeyMaterialService<R> {
    pub fn new(repo: Arc<R>, master: EnvelopeKey, key_size: KeySize) -> Self {
        Self {
            repo,
            master,
            key_size,
        }
    }

    /// Enrols a device owner: fresh session token, fresh signing key.
    ///
    /// The plaintext token and key are returned exactly once.
    #[instrument(skip(self))]
    pub async fn provision(&self, label: String) -> Result<ProvisionedOwner, AppError> {
        let token = generate_session_token();
        let owner = Owner::new(label, hash_session_token(&token))?;
        let key = EnvelopeKey::generate(self.key_size);
        let wrapped = self.wrap(&key)?;

        let owner = self
            .repo
            .create_owner(owner.clone(), WrappedKey::new(owner.id, wrapped, 1))
            .await?;
        info!(owner_id = %owner.id, "Provisioned owner");

        Ok(ProvisionedOwner {
            owner_id: owner.id,
            session_token: token,
            signing_key: key.to_hex(),
            key_version: 1,
        })
    }

    /// Resolves a bearer session token to an active owner.
    pub async fn authenticate(&self, token: &str) -> Result<Owner, AppError> {
        self.repo
            .find_owner_by_token_hash(&hash_session_token(token))
            .await?
            .filter(|owner| verify_session_token(token, &owner.token_hash))
            .ok_or_else(|| AppError::Unauthenticated("Invalid session token".into()))
    }

    /// Returns the owner's active key.
    ///
    /// A missing or unreadable key is `Fatal`: there is no fallback key.
    pub async fn get_key(&self, owner_id: OwnerId) -> Result<KeyMaterial, AppError> {
        let wrapped = self.repo.get_wrapped_key(owner_id).await?.ok_or_else(|| {
            error!(%owner_id, "Owner has no key material");
            AppError::Fatal("Key material unavailable".into())
        })?;

        let key = unwrap_key(&self.master, &wrapped.wrapped).map_err(|e| {
            error!(%owner_id, error = %e, "Stored key material could not be unwrapped");
            AppError::Fatal("Key material unavailable".into())
        })?;

        Ok(KeyMaterial::new(owner_id, key, wrapped.key_version))
    }

    /// Replaces the owner's key with a fresh one and returns it once.
    #[instrument(skip(self))]
    pub async fn rotate_key(&self, owner_id: OwnerId) -> Result<RotatedKey, AppError> {
        if self.repo.get_owner(owner_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Owner {}", owner_id)));
        }
        let current_version = self
            .repo
            .get_wrapped_key(owner_id)
            .await?
            .map(|k| k.key_version)
            .unwrap_or(0);

        let key = EnvelopeKey::generate(self.key_size);
        let key_version = current_version + 1;
        self.repo
            .replace_wrapped_key(WrappedKey::new(owner_id, self.wrap(&key)?, key_version))
            .await?;
        info!(%owner_id, key_version, "Rotated owner key");

        Ok(RotatedKey {
            owner_id,
            signing_key: key.to_hex(),
            key_version,
        })
    }

    fn wrap(&self, key: &EnvelopeKey) -> Result<String, AppError> {
        wrap_key(&self.master, key).map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use banking_repo::MemoryRepo;

    use super::*;

    fn service() -> KeyMaterialService<MemoryRepo> {
        KeyMaterialService::new(
            Arc::new(MemoryRepo::new()),
            EnvelopeKey::generate(KeySize::Aes256),
            KeySize::Aes256,
        )
    }

    #[tokio::test]
    async fn test_provisioned_key_matches_stored_key() {
        let keys = service();
        let provisioned = keys.provision("pixel-7".into()).await.unwrap();

        let owner = keys.authenticate(&provisioned.session_token).await.unwrap();
        let material = keys.get_key(owner.id).await.unwrap();

        assert_eq!(material.key.to_hex(), provisioned.signing_key);
        assert_eq!(material.key_version, 1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthenticated() {
        let keys = service();
        let result = keys.authenticate("st_not_a_real_token").await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_authentication_checks_token_against_stored_hash() {
        let keys = service();
        let provisioned = keys.provision("pixel-7".into()).await.unwrap();

        let owner = keys.authenticate(&provisioned.session_token).await.unwrap();
        assert!(verify_session_token(&provisioned.session_token, &owner.token_hash));

        let mut altered = provisioned.session_token.clone();
        let last = altered.pop().unwrap();
        altered.push(if last == 'a' { 'b' } else { 'a' });
        let result = keys.authenticate(&altered).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_missing_key_is_fatal() {
        let keys = service();
        let result = keys.get_key(OwnerId::new()).await;
        assert!(matches!(result, Err(AppError::Fatal(_))));
    }

    #[tokio::test]
    async fn test_key_under_other_master_is_fatal() {
        let repo = Arc::new(MemoryRepo::new());
        let first = KeyMaterialService::new(
            repo.clone(),
            EnvelopeKey::generate(KeySize::Aes256),
            KeySize::Aes256,
        );
        let second =
            KeyMaterialService::new(repo, EnvelopeKey::generate(KeySize::Aes256), KeySize::Aes256);

        let provisioned = first.provision("pixel-7".into()).await.unwrap();
        let result = second.get_key(provisioned.owner_id).await;

        assert!(matches!(result, Err(AppError::Fatal(_))));
    }

    #[tokio::test]
    async fn test_rotation_replaces_key() {
        let keys = service();
        let provisioned = keys.provision("pixel-7".into()).await.unwrap();

        let rotated = keys.rotate_key(provisioned.owner_id).await.unwrap();
        let material = keys.get_key(provisioned.owner_id).await.unwrap();

        assert_eq!(rotated.key_version, 2);
        assert_ne!(rotated.signing_key, provisioned.signing_key);
        assert_eq!(material.key.to_hex(), rotated.signing_key);
    }

    #[tokio::test]
    async fn test_rotate_unknown_owner_not_found() {
        let keys = service();
        let result = keys.rotate_key(OwnerId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
