//! OTP transaction coordinator.
//!
//! Drives a [`TransactionIntent`] through issuance, verification and
//! execution. Every intent is persisted under its identifier, so progress is
//! verified against stored state instead of trusting the `retry_flag` and
//! `txn_identifier` the caller echoes back.
//!
//! Rules enforced here:
//! - no side effect before the gateway verified an OTP;
//! - one identifier denotes one (owner, operation, payload) for its lifetime;
//! - a committed intent is never executed again; repeats replay the stored result;
//! - all work on one identifier is serialized.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use banking_types::{
    AppError, ExternalGateway, FailureStage, GatewayError, GatewayRequest, IdentifierGenerator,
    IntentRepository, IntentResponse, IntentState, IntentStatus, IntentView, OperationPayload,
    OtpFields, OwnerId, TransactionIntent, TxnIdentifier,
};
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

/// Tunables for the OTP round trip.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Lifetime of an issued OTP; also bounds how long an identifier waits for verification.
    pub intent_ttl: chrono::Duration,
    /// OTP submissions allowed per intent, across resends.
    pub max_otp_attempts: u32,
    /// Deadline for each gateway call.
    pub gateway_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            intent_ttl: chrono::Duration::seconds(300),
            max_otp_attempts: 3,
            gateway_timeout: Duration::from_secs(15),
        }
    }
}

type LockTable = DashMap<TxnIdentifier, Arc<Mutex<()>>>;

/// Per-identifier async mutexes. Entries are dropped once nobody holds or awaits them.
#[derive(Default)]
struct IdentifierLocks {
    table: Arc<LockTable>,
}

impl IdentifierLocks {
    async fn acquire(&self, identifier: &TxnIdentifier) -> IdentifierGuard {
        // Built before the wait so a cancelled waiter still cleans up.
        let mut held = IdentifierGuard {
            table: Arc::clone(&self.table),
            identifier: identifier.clone(),
            guard: None,
        };
        let lock = self.table.entry(identifier.clone()).or_default().clone();
        held.guard = Some(lock.lock_owned().await);
        held
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.len()
    }
}

/// Holds one identifier's lock; the table entry goes with the last user.
struct IdentifierGuard {
    table: Arc<LockTable>,
    identifier: TxnIdentifier,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdentifierGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.table
            .remove_if(&self.identifier, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct OtpTransactionCoordinator<R: IntentRepository> {
    repo: Arc<R>,
    gateway: Arc<dyn ExternalGateway>,
    identifiers: Arc<dyn IdentifierGenerator>,
    locks: IdentifierLocks,
    config: CoordinatorConfig,
}

impl<R: IntentRepository> OtpTransactionCoordinator<R> {
    pub fn new(
        repo: Arc<R>,
        gateway: Arc<dyn ExternalGateway>,
        identifiers: Arc<dyn IdentifierGenerator>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            repo,
            gateway,
            identifiers,
            locks: IdentifierLocks::default(),
            config,
        }
    }

    /// Advances the intent named by `fields` for one submission.
    ///
    /// Without an `otp` this (re)issues an OTP and never executes anything.
    /// With an `otp` it verifies and, on success, executes exactly once.
    #[instrument(
        skip(self, payload, fields),
        fields(owner_id = %owner_id, operation = %payload.kind(), txn_identifier = tracing::field::Empty)
    )]
    pub async fn submit(
        &self,
        owner_id: OwnerId,
        payload: OperationPayload,
        fields: &OtpFields,
    ) -> Result<IntentResponse, AppError> {
        let identifier = match (fields.identifier()?, &fields.otp) {
            (Some(identifier), _) => identifier,
            (None, Some(_)) => {
                return Err(AppError::ValidationFailed(
                    "txn_identifier is required when submitting an otp".into(),
                ));
            }
            (None, None) if fields.retry_flag.is_yes() => {
                return Err(AppError::IdentifierConflict(
                    "retry_flag=Y requires the txn_identifier of the original request".into(),
                ));
            }
            (None, None) => self.identifiers.new_identifier(),
        };
        tracing::Span::current().record("txn_identifier", identifier.as_str());

        let request = GatewayRequest {
            identifier: identifier.clone(),
            owner_id,
            operation: payload.kind(),
            details: payload.details(),
        };
        let digest = payload.digest();

        let _guard = self.locks.acquire(&identifier).await;
        match &fields.otp {
            None => self.request_otp(&request, digest, fields).await,
            Some(otp) => self.confirm(&request, &digest, otp, fields).await,
        }
    }

    /// Read model of an intent owned by `owner_id`.
    pub async fn status(
        &self,
        owner_id: OwnerId,
        identifier: &TxnIdentifier,
    ) -> Result<IntentView, AppError> {
        let intent = self
            .repo
            .get_intent(identifier)
            .await?
            .filter(|i| i.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound(format!("Transaction {}", identifier)))?;

        Ok(IntentView {
            txn_identifier: intent.identifier.to_string(),
            operation: intent.operation_kind,
            state: intent.state.name().to_string(),
            otp_attempts: intent.otp_attempts,
            expires_at: intent.expires_at,
            reference: intent.committed_reference().map(str::to_string),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Issuance
    // ─────────────────────────────────────────────────────────────────────────────

    async fn request_otp(
        &self,
        req: &GatewayRequest,
        digest: String,
        fields: &OtpFields,
    ) -> Result<IntentResponse, AppError> {
        let mut intent = match self.repo.get_intent(&req.identifier).await? {
            None => {
                if fields.retry_flag.is_yes() {
                    return Err(conflict("no transaction is known under this txn_identifier"));
                }
                let intent = TransactionIntent::requested(
                    req.identifier.clone(),
                    req.owner_id,
                    req.operation,
                    digest,
                    self.config.intent_ttl,
                );
                self.repo.insert_intent(&intent).await?;
                intent
            }
            Some(mut intent) => {
                ensure_binding(&intent, req, &digest)?;
                if !fields.resend_otp.is_yes() && !fields.retry_flag.is_yes() {
                    return Err(conflict(
                        "an OTP was already issued for this txn_identifier; set resend_otp=Y to request another",
                    ));
                }
                if !intent.can_reissue_otp() {
                    return Err(not_reissuable(&intent));
                }
                intent.record_reissue(self.config.intent_ttl)?;
                self.repo.update_intent(&mut intent).await?;
                intent
            }
        };

        match self.call(self.gateway.issue_otp(req)).await {
            Ok(dispatch) => {
                info!("OTP issued");
                Ok(IntentResponse {
                    txn_identifier: req.identifier.to_string(),
                    status: IntentStatus::OtpSent,
                    operation: req.operation,
                    message: "OTP sent".into(),
                    reference: None,
                    otp_expires_at: Some(intent.expires_at),
                    otp_destination: dispatch.masked_destination,
                })
            }
            Err(err) => {
                intent.mark_failed(FailureStage::Issuance, err.to_string(), err.is_retryable());
                self.save_failure(&mut intent).await;
                Err(err.into())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Verification and execution
    // ─────────────────────────────────────────────────────────────────────────────

    async fn confirm(
        &self,
        req: &GatewayRequest,
        digest: &str,
        otp: &str,
        fields: &OtpFields,
    ) -> Result<IntentResponse, AppError> {
        let mut intent = self
            .repo
            .get_intent(&req.identifier)
            .await?
            .ok_or_else(|| conflict("no OTP was issued under this txn_identifier"))?;
        ensure_binding(&intent, req, digest)?;

        if let Some(reference) = intent.committed_reference() {
            if !fields.retry_flag.is_yes() {
                return Err(conflict(
                    "transaction already completed; resubmit with retry_flag=Y to fetch the result",
                ));
            }
            info!("Replaying committed result");
            return Ok(completed(&intent, reference.to_string(), "Transaction already completed"));
        }

        if let IntentState::Failed {
            retryable: false,
            reason,
            ..
        } = &intent.state
        {
            return Err(AppError::Forbidden(reason.clone()));
        }

        if intent.awaits_execution() {
            if !fields.retry_flag.is_yes() {
                return Err(conflict(
                    "OTP already verified; resubmit with retry_flag=Y to retry the operation",
                ));
            }
            return self.execute(intent, req).await;
        }

        if !intent.awaits_verification() {
            return Err(conflict(
                "no OTP is outstanding for this txn_identifier; request one with resend_otp=Y",
            ));
        }
        if intent.is_expired(Utc::now()) {
            return Err(AppError::OtpExpired);
        }
        if intent.otp_attempts > 0 && !fields.retry_flag.is_yes() {
            return Err(conflict(
                "an OTP was already submitted for this txn_identifier; resubmit with retry_flag=Y",
            ));
        }

        intent.record_otp_attempt();
        match self.call(self.gateway.verify_otp(req, otp)).await {
            Ok(()) => {
                intent.mark_verified()?;
                self.repo.update_intent(&mut intent).await?;
                info!("OTP verified");
                self.execute(intent, req).await
            }
            Err(err) => {
                let retryable = match err {
                    GatewayError::OtpMismatch => intent.otp_attempts < self.config.max_otp_attempts,
                    _ => err.is_retryable(),
                };
                warn!(attempts = intent.otp_attempts, retryable, error = %err, "OTP verification failed");
                intent.mark_failed(FailureStage::Verification, err.to_string(), retryable);
                self.save_failure(&mut intent).await;
                Err(err.into())
            }
        }
    }

    async fn execute(
        &self,
        mut intent: TransactionIntent,
        req: &GatewayRequest,
    ) -> Result<IntentResponse, AppError> {
        match self.call(self.gateway.execute(req)).await {
            Ok(receipt) => {
                intent.mark_committed(receipt.reference.clone())?;
                self.repo.update_intent(&mut intent).await?;
                info!(reference = %receipt.reference, "Transaction committed");
                Ok(completed(&intent, receipt.reference, &receipt.message))
            }
            Err(err) => {
                warn!(error = %err, "Gateway execution failed");
                intent.mark_failed(FailureStage::Execution, err.to_string(), err.is_retryable());
                self.save_failure(&mut intent).await;
                Err(err.into())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────────

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.config.gateway_timeout, fut)
            .await
            .unwrap_or(Err(GatewayError::Timeout))
    }

    /// The gateway error is what the caller sees; a failed write is only logged.
    async fn save_failure(&self, intent: &mut TransactionIntent) {
        if let Err(e) = self.repo.update_intent(intent).await {
            warn!(error = %e, "Failed to record intent failure");
        }
    }
}

fn conflict(msg: &str) -> AppError {
    AppError::IdentifierConflict(msg.to_string())
}

fn ensure_binding(
    intent: &TransactionIntent,
    req: &GatewayRequest,
    digest: &str,
) -> Result<(), AppError> {
    if intent.binds(req.owner_id, req.operation, digest) {
        Ok(())
    } else {
        Err(conflict("txn_identifier belongs to a different operation"))
    }
}

fn not_reissuable(intent: &TransactionIntent) -> AppError {
    match &intent.state {
        IntentState::Committed { .. } => conflict("transaction already completed"),
        IntentState::Failed {
            retryable: false,
            reason,
            ..
        } => AppError::Forbidden(reason.clone()),
        _ => conflict(
            "OTP already verified; resubmit with the otp and retry_flag=Y to retry the operation",
        ),
    }
}

fn completed(intent: &TransactionIntent, reference: String, message: &str) -> IntentResponse {
    IntentResponse {
        txn_identifier: intent.identifier.to_string(),
        status: IntentStatus::Completed,
        operation: intent.operation_kind,
        message: message.to_string(),
        reference: Some(reference),
        otp_expires_at: None,
        otp_destination: None,
    }
}
