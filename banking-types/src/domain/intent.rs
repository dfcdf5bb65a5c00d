//! OTP-guarded transaction intent.
//!
//! An intent is persisted under its identifier when an OTP is first issued
//! and is advanced by every later submission that echoes the identifier:
//!
//! ```text
//! (draft) --issue--> OtpRequested --verify--> OtpVerified --execute--> Committed
//!                         |                        |
//!                         +--------> Failed <------+
//! ```
//!
//! A retryable failure keeps the stage it failed in so a retry resumes from
//! the right place: a failed execution is re-executed without asking for a
//! second OTP.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::identifier::TxnIdentifier;
use super::owner::OwnerId;
use crate::error::DomainError;

/// The closed set of OTP-guarded operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    AddBeneficiary,
    Payment,
    SetCardPin,
    ResetCardPin,
    BlockCard,
    ChangeLimit,
    AddNominee,
    ResetMpin,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::AddBeneficiary => "ADD_BENEFICIARY",
            OperationKind::Payment => "PAYMENT",
            OperationKind::SetCardPin => "SET_CARD_PIN",
            OperationKind::ResetCardPin => "RESET_CARD_PIN",
            OperationKind::BlockCard => "BLOCK_CARD",
            OperationKind::ChangeLimit => "CHANGE_LIMIT",
            OperationKind::AddNominee => "ADD_NOMINEE",
            OperationKind::ResetMpin => "RESET_MPIN",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD_BENEFICIARY" => Ok(OperationKind::AddBeneficiary),
            "PAYMENT" => Ok(OperationKind::Payment),
            "SET_CARD_PIN" => Ok(OperationKind::SetCardPin),
            "RESET_CARD_PIN" => Ok(OperationKind::ResetCardPin),
            "BLOCK_CARD" => Ok(OperationKind::BlockCard),
            "CHANGE_LIMIT" => Ok(OperationKind::ChangeLimit),
            "ADD_NOMINEE" => Ok(OperationKind::AddNominee),
            "RESET_MPIN" => Ok(OperationKind::ResetMpin),
            other => Err(DomainError::ValidationError(format!(
                "Unknown operation kind: {}",
                other
            ))),
        }
    }
}

/// Where in the round trip a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureStage {
    Issuance,
    Verification,
    Execution,
}

/// State of a persisted intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentState {
    OtpRequested {
        issued_at: DateTime<Utc>,
        resend_count: u32,
    },
    OtpVerified {
        verified_at: DateTime<Utc>,
    },
    Committed {
        reference: String,
        committed_at: DateTime<Utc>,
    },
    Failed {
        stage: FailureStage,
        reason: String,
        retryable: bool,
    },
}

impl IntentState {
    pub fn name(&self) -> &'static str {
        match self {
            IntentState::OtpRequested { .. } => "OTP_REQUESTED",
            IntentState::OtpVerified { .. } => "OTP_VERIFIED",
            IntentState::Committed { .. } => "COMMITTED",
            IntentState::Failed { .. } => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentState::Committed { .. } | IntentState::Failed { retryable: false, .. }
        )
    }
}

/// An OTP-guarded operation bound to one identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub identifier: TxnIdentifier,
    pub owner_id: OwnerId,
    pub operation_kind: OperationKind,
    /// SHA-256 of the canonical operation payload.
    pub payload_digest: String,
    pub state: IntentState,
    pub otp_attempts: u32,
    /// Optimistic concurrency counter, bumped by every stored update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TransactionIntent {
    /// Creates an intent whose OTP has just been requested.
    pub fn requested(
        identifier: TxnIdentifier,
        owner_id: OwnerId,
        operation_kind: OperationKind,
        payload_digest: String,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            identifier,
            owner_id,
            operation_kind,
            payload_digest,
            state: IntentState::OtpRequested {
                issued_at: now,
                resend_count: 0,
            },
            otp_attempts: 0,
            version: 0,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
        }
    }

    /// Reconstructs an intent from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        identifier: TxnIdentifier,
        owner_id: OwnerId,
        operation_kind: OperationKind,
        payload_digest: String,
        state: IntentState,
        otp_attempts: u32,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier,
            owner_id,
            operation_kind,
            payload_digest,
            state,
            otp_attempts,
            version,
            created_at,
            updated_at,
            expires_at,
        }
    }

    /// Whether this intent denotes the given logical operation.
    pub fn binds(&self, owner_id: OwnerId, kind: OperationKind, payload_digest: &str) -> bool {
        self.owner_id == owner_id
            && self.operation_kind == kind
            && self.payload_digest == payload_digest
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether a fresh OTP may be issued for this intent.
    pub fn can_reissue_otp(&self) -> bool {
        match &self.state {
            IntentState::OtpRequested { .. } => true,
            IntentState::Failed {
                stage, retryable, ..
            } => *retryable && *stage != FailureStage::Execution,
            _ => false,
        }
    }

    /// Whether a submitted OTP should be checked against the gateway.
    pub fn awaits_verification(&self) -> bool {
        match &self.state {
            IntentState::OtpRequested { .. } => true,
            IntentState::Failed {
                stage: FailureStage::Verification,
                retryable: true,
                ..
            } => true,
            _ => false,
        }
    }

    /// Whether the OTP is verified and only the side effect is outstanding.
    pub fn awaits_execution(&self) -> bool {
        match &self.state {
            IntentState::OtpVerified { .. } => true,
            IntentState::Failed {
                stage: FailureStage::Execution,
                retryable: true,
                ..
            } => true,
            _ => false,
        }
    }

    /// Records a (re)issued OTP and extends the deadline.
    pub fn record_reissue(&mut self, ttl: Duration) -> Result<(), DomainError> {
        if !self.can_reissue_otp() {
            return Err(self.invalid("reissue an OTP for"));
        }
        let now = Utc::now();
        let resend_count = match &self.state {
            IntentState::OtpRequested { resend_count, .. } => resend_count + 1,
            _ => 1,
        };
        self.state = IntentState::OtpRequested {
            issued_at: now,
            resend_count,
        };
        self.expires_at = now + ttl;
        self.updated_at = now;
        Ok(())
    }

    pub fn record_otp_attempt(&mut self) {
        self.otp_attempts += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_verified(&mut self) -> Result<(), DomainError> {
        if !self.awaits_verification() {
            return Err(self.invalid("verify"));
        }
        let now = Utc::now();
        self.state = IntentState::OtpVerified { verified_at: now };
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_committed(&mut self, reference: String) -> Result<(), DomainError> {
        if !self.awaits_execution() {
            return Err(self.invalid("commit"));
        }
        let now = Utc::now();
        self.state = IntentState::Committed {
            reference,
            committed_at: now,
        };
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_failed(&mut self, stage: FailureStage, reason: String, retryable: bool) {
        self.state = IntentState::Failed {
            stage,
            reason,
            retryable,
        };
        self.updated_at = Utc::now();
    }

    /// Reference of the committed side effect, if any.
    pub fn committed_reference(&self) -> Option<&str> {
        match &self.state {
            IntentState::Committed { reference, .. } => Some(reference),
            _ => None,
        }
    }

    fn invalid(&self, action: &'static str) -> DomainError {
        DomainError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }
}
