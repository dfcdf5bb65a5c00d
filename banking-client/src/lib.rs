//! # Banking Client SDK
//!
//! A typed Rust client for the banking middleware. OTP-guarded requests are
//! sealed with the owner's signing key before they leave the process and
//! responses are opened with the same key.

use banking_types::{
    EncryptedPayload, ErrorBody, IfscLookupRequest, IfscLookupResponse, IntentResponse,
    IntentView, OperationKind, OperationRequest, OtpFields, OtpGuarded, OwnerId,
    ProvisionOwnerRequest, ProvisionedOwner, RotatedKey,
};
use reqwest::Client;
use secure_envelope::{EnvelopeError, EnvelopeKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {kind} - {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("No signing key configured")]
    MissingKey,
}

/// Route serving each operation kind.
pub fn operation_path(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::AddBeneficiary => "/api/beneficiaries",
        OperationKind::Payment => "/api/payments",
        OperationKind::SetCardPin => "/api/cards/pin",
        OperationKind::ResetCardPin => "/api/cards/pin/reset",
        OperationKind::BlockCard => "/api/cards/block",
        OperationKind::ChangeLimit => "/api/cards/limits",
        OperationKind::AddNominee => "/api/nominees",
        OperationKind::ResetMpin => "/api/mpin/reset",
    }
}

/// Banking middleware client.
pub struct BankingClient {
    base_url: String,
    token: Option<String>,
    key: Option<EnvelopeKey>,
    http: Client,
}

impl BankingClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            key: None,
            http: Client::new(),
        }
    }

    /// Sets the bearer token (a session token, or the admin token for admin calls).
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the owner's signing key from its hex encoding.
    pub fn with_signing_key(mut self, signing_key: &str) -> Result<Self, ClientError> {
        self.key = Some(EnvelopeKey::from_hex(signing_key)?);
        Ok(self)
    }

    /// Client for a freshly provisioned owner.
    pub fn for_owner(
        base_url: impl Into<String>,
        owner: &ProvisionedOwner,
    ) -> Result<Self, ClientError> {
        Self::new(base_url)
            .with_token(owner.session_token.clone())
            .with_signing_key(&owner.signing_key)
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────

    /// Enrols a device owner. Requires the admin token.
    pub async fn provision_owner(&self, label: &str) -> Result<ProvisionedOwner, ClientError> {
        let req = ProvisionOwnerRequest {
            label: label.to_string(),
        };
        self.post_json("/api/admin/owners", &req).await
    }

    /// Replaces an owner's signing key. Requires the admin token.
    pub async fn rotate_owner_key(&self, owner_id: OwnerId) -> Result<RotatedKey, ClientError> {
        self.post_json(
            &format!("/api/admin/owners/{}/rotate", owner_id),
            &serde_json::json!({}),
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // OTP-guarded operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Submits one step of an OTP-guarded operation.
    pub async fn submit<T: OperationRequest>(
        &self,
        payload: T,
        otp: OtpFields,
    ) -> Result<IntentResponse, ClientError> {
        let request = OtpGuarded { payload, otp };
        self.post_sealed(operation_path(T::KIND), &request).await
    }

    /// Starts an operation: asks the gateway to send an OTP.
    pub async fn request_otp<T: OperationRequest>(
        &self,
        payload: T,
    ) -> Result<IntentResponse, ClientError> {
        self.submit(payload, OtpFields::issue(true)).await
    }

    /// Asks for another OTP under an already issued identifier.
    pub async fn resend_otp<T: OperationRequest>(
        &self,
        payload: T,
        txn_identifier: &str,
    ) -> Result<IntentResponse, ClientError> {
        let mut fields = OtpFields::issue(true);
        fields.txn_identifier = Some(txn_identifier.to_string());
        self.submit(payload, fields).await
    }

    /// Completes an operation with the received OTP.
    ///
    /// Pass `retry = true` when repeating a confirmation whose outcome is unknown.
    pub async fn confirm_otp<T: OperationRequest>(
        &self,
        payload: T,
        txn_identifier: &str,
        otp: &str,
        retry: bool,
    ) -> Result<IntentResponse, ClientError> {
        self.submit(payload, OtpFields::confirm(txn_identifier, otp, retry))
            .await
    }

    /// State of one of this owner's intents.
    pub async fn intent_status(&self, txn_identifier: &str) -> Result<IntentView, ClientError> {
        let mut req = self
            .http
            .get(format!("{}/api/intents/{}", self.base_url, txn_identifier));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let sealed: EncryptedPayload = self.handle_response(req.send().await?).await?;
        self.open(&sealed)
    }

    /// Validates an IFSC code.
    pub async fn validate_ifsc(&self, ifsc: &str) -> Result<IfscLookupResponse, ClientError> {
        let req = IfscLookupRequest {
            ifsc: ifsc.to_string(),
        };
        self.post_json("/api/ifsc/validate", &req).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn key(&self) -> Result<&EnvelopeKey, ClientError> {
        self.key.as_ref().ok_or(ClientError::MissingKey)
    }

    fn seal<B: Serialize>(&self, body: &B) -> Result<EncryptedPayload, ClientError> {
        let plaintext = Zeroizing::new(serde_json::to_vec(body)?);
        Ok(EncryptedPayload {
            data: self.key()?.seal(&plaintext)?,
        })
    }

    fn open<T: DeserializeOwned>(&self, sealed: &EncryptedPayload) -> Result<T, ClientError> {
        let plaintext = Zeroizing::new(self.key()?.open(&sealed.data)?);
        Ok(serde_json::from_slice(&plaintext)?)
    }

    async fn post_sealed<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let envelope = self.seal(body)?;
        let sealed: EncryptedPayload = self.post_json(path, &envelope).await?;
        self.open(&sealed)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let (kind, message) = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => (err.error, err.message),
                Err(_) => ("UNKNOWN".to_string(), body),
            };
            Err(ClientError::Api {
                status: status.as_u16(),
                kind,
                message,
            })
        }
    }
}
