//! Outbound port to the bank / UPI switch.

use serde::{Deserialize, Serialize};

use crate::domain::{OperationKind, OwnerId, TxnIdentifier};
use crate::error::GatewayError;

/// What the gateway needs to issue, verify or execute one operation.
///
/// `identifier` is forwarded on every call so the gateway can de-duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub identifier: TxnIdentifier,
    pub owner_id: OwnerId,
    pub operation: OperationKind,
    pub details: serde_json::Value,
}

/// Acknowledgement of an OTP dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtpDispatch {
    /// e.g. `"******3210"`
    pub masked_destination: Option<String>,
}

/// Result of an executed side effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayReceipt {
    pub reference: String,
    pub message: String,
}

#[async_trait::async_trait]
pub trait ExternalGateway: Send + Sync + 'static {
    /// Sends an OTP to the owner's registered device.
    async fn issue_otp(&self, req: &GatewayRequest) -> Result<OtpDispatch, GatewayError>;

    /// Checks an OTP against the one issued for `req.identifier`.
    async fn verify_otp(&self, req: &GatewayRequest, otp: &str) -> Result<(), GatewayError>;

    /// Performs the side effect. Repeated calls with one identifier must not
    /// apply it twice.
    async fn execute(&self, req: &GatewayRequest) -> Result<GatewayReceipt, GatewayError>;
}
