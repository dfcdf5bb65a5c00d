//! Banking Application Service
//!
//! Orchestrates key material, the codecs and the OTP coordinator behind the
//! ports. Contains NO infrastructure logic.

use std::sync::Arc;

use banking_repo::security::secrets_match;
use banking_types::{
    AppError, BankingRepository, DomainError, EncryptedPayload, ExternalGateway,
    IdentifierGenerator, IfscLookupRequest, IfscLookupResponse, OperationRequest, OtpGuarded,
    Owner, OwnerId, ProvisionOwnerRequest, ProvisionedOwner, RandomIdentifierGenerator,
    RotatedKey, TxnIdentifier,
};
use secure_envelope::{EnvelopeKey, KeySize};
use tracing::instrument;

use crate::codec;
use crate::coordinator::{CoordinatorConfig, OtpTransactionCoordinator};
use crate::keys::KeyMaterialService;

/// Process-level settings injected at startup.
pub struct ServiceConfig {
    pub master_key: EnvelopeKey,
    pub admin_token: String,
    /// Size of newly provisioned owner keys.
    pub owner_key_size: KeySize,
    pub identifier_length: usize,
    pub coordinator: CoordinatorConfig,
}

impl ServiceConfig {
    pub fn new(master_key: EnvelopeKey, admin_token: impl Into<String>) -> Self {
        Self {
            master_key,
            admin_token: admin_token.into(),
            owner_key_size: KeySize::Aes256,
            identifier_length: 35,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

/// Application service for the mobile-banking middleware.
///
/// Generic over `R: BankingRepository` - the adapter is injected at compile time.
/// The gateway and identifier generator are injected as trait objects.
pub struct BankingService<R: BankingRepository> {
    repo: Arc<R>,
    keys: KeyMaterialService<R>,
    coordinator: OtpTransactionCoordinator<R>,
    admin_token: String,
}

impl<R: BankingRepository> BankingService<R> {
    /// Creates the service with the default random identifier generator.
    pub fn new(
        repo: R,
        gateway: Arc<dyn ExternalGateway>,
        config: ServiceConfig,
    ) -> Result<Self, DomainError> {
        let generator = RandomIdentifierGenerator::new(config.identifier_length)?;
        Ok(Self::with_identifier_generator(
            repo,
            gateway,
            Arc::new(generator),
            config,
        ))
    }

    pub fn with_identifier_generator(
        repo: R,
        gateway: Arc<dyn ExternalGateway>,
        identifiers: Arc<dyn IdentifierGenerator>,
        config: ServiceConfig,
    ) -> Self {
        let repo = Arc::new(repo);
        Self {
            keys: KeyMaterialService::new(repo.clone(), config.master_key, config.owner_key_size),
            coordinator: OtpTransactionCoordinator::new(
                repo.clone(),
                gateway,
                identifiers,
                config.coordinator,
            ),
            repo,
            admin_token: config.admin_token,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn coordinator(&self) -> &OtpTransactionCoordinator<R> {
        &self.coordinator
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Authentication & provisioning
    // ─────────────────────────────────────────────────────────────────────────────

    /// Resolves a bearer session token to its owner.
    pub async fn authenticate(&self, session_token: &str) -> Result<Owner, AppError> {
        self.keys.authenticate(session_token).await
    }

    /// Whether `token` is the configured admin token. An empty admin token matches nothing.
    pub fn is_admin(&self, token: &str) -> bool {
        !self.admin_token.is_empty() && secrets_match(token, &self.admin_token)
    }

    #[instrument(skip(self, req), fields(label = %req.label))]
    pub async fn provision_owner(
        &self,
        req: ProvisionOwnerRequest,
    ) -> Result<ProvisionedOwner, AppError> {
        self.keys.provision(req.label).await
    }

    pub async fn rotate_owner_key(&self, owner_id: OwnerId) -> Result<RotatedKey, AppError> {
        self.keys.rotate_key(owner_id).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // OTP-guarded operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens an encrypted OTP-guarded request of type `T`, advances its
    /// intent and seals the response under the same owner key.
    #[instrument(skip(self, owner, body), fields(owner_id = %owner.id, operation = %T::KIND))]
    pub async fn submit_sealed<T: OperationRequest>(
        &self,
        owner: &Owner,
        body: &[u8],
    ) -> Result<EncryptedPayload, AppError> {
        let envelope = codec::parse_envelope(body)?;
        let key = self.keys.get_key(owner.id).await?;
        let request: OtpGuarded<T> = codec::decode_request(&key, &envelope)?;

        let response = self
            .coordinator
            .submit(owner.id, request.payload.into_payload(), &request.otp)
            .await?;

        Ok(codec::encode_response(&key, &response)?)
    }

    /// State of one of the owner's intents, sealed under the owner key.
    pub async fn intent_status(
        &self,
        owner: &Owner,
        identifier: &str,
    ) -> Result<EncryptedPayload, AppError> {
        let identifier = TxnIdentifier::parse(identifier)?;
        let view = self.coordinator.status(owner.id, &identifier).await?;
        let key = self.keys.get_key(owner.id).await?;
        Ok(codec::encode_response(&key, &view)?)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Plaintext reads
    // ─────────────────────────────────────────────────────────────────────────────

    /// Validates an IFSC code and splits it into bank and branch parts.
    pub fn validate_ifsc(&self, body: &[u8]) -> Result<IfscLookupResponse, AppError> {
        let req: IfscLookupRequest = codec::decode_plain(body)?;
        Ok(IfscLookupResponse {
            bank_code: req.ifsc[..4].to_string(),
            branch_code: req.ifsc[5..].to_string(),
            ifsc: req.ifsc,
        })
    }
}
