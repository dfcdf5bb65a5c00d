//! HTTP adapter for the bank / UPI switch.
//!
//! Every call is a JSON `POST` answered with
//! `{ "status": "OK" | "OTP_MISMATCH" | "OTP_EXPIRED" | "REJECTED", ... }`.
//! When a shared secret is configured the raw body is signed with
//! HMAC-SHA256 and sent in `X-Signature`.

use std::time::Duration;

use async_trait::async_trait;
use banking_types::{ExternalGateway, GatewayError, GatewayReceipt, GatewayRequest, OtpDispatch};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::security::sign_gateway_request;

pub const SIGNATURE_HEADER: &str = "X-Signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ReplyStatus {
    Ok,
    OtpMismatch,
    OtpExpired,
    Rejected,
}

#[derive(Debug, Deserialize)]
struct GatewayReply {
    status: ReplyStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    masked_destination: Option<String>,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
    #[serde(flatten)]
    request: &'a GatewayRequest,
    otp: &'a str,
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
}

impl HttpGateway {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        secret: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret,
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<GatewayReply, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let bytes = serde_json::to_vec(body)
            .map_err(|e| GatewayError::Unavailable(format!("encode request: {}", e)))?;

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_gateway_request(&bytes, secret));
        }

        let response = request.body(bytes).send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            warn!(%url, %status, "Gateway returned a server error");
            return Err(GatewayError::Unavailable(format!("HTTP {}", status)));
        }

        let reply = response.json::<GatewayReply>().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else if status.is_client_error() {
                GatewayError::Rejected(format!("HTTP {}", status))
            } else {
                GatewayError::Unavailable(format!("invalid gateway response: {}", e))
            }
        })?;
        debug!(%url, status = ?reply.status, "Gateway replied");
        Ok(reply)
    }
}

fn into_result(reply: GatewayReply) -> Result<GatewayReply, GatewayError> {
    match reply.status {
        ReplyStatus::Ok => Ok(reply),
        ReplyStatus::OtpMismatch => Err(GatewayError::OtpMismatch),
        ReplyStatus::OtpExpired => Err(GatewayError::OtpExpired),
        ReplyStatus::Rejected => Err(GatewayError::Rejected(
            reply.message.unwrap_or_else(|| "rejected by bank".into()),
        )),
    }
}

#[async_trait]
impl ExternalGateway for HttpGateway {
    #[instrument(skip(self, req), fields(txn_identifier = %req.identifier, operation = %req.operation))]
    async fn issue_otp(&self, req: &GatewayRequest) -> Result<OtpDispatch, GatewayError> {
        let reply = into_result(self.post("/otp/issue", req).await?)?;
        Ok(OtpDispatch {
            masked_destination: reply.masked_destination,
        })
    }

    #[instrument(skip(self, req, otp), fields(txn_identifier = %req.identifier, operation = %req.operation))]
    async fn verify_otp(&self, req: &GatewayRequest, otp: &str) -> Result<(), GatewayError> {
        let body = VerifyBody { request: req, otp };
        into_result(self.post("/otp/verify", &body).await?)?;
        Ok(())
    }

    #[instrument(skip(self, req), fields(txn_identifier = %req.identifier, operation = %req.operation))]
    async fn execute(&self, req: &GatewayRequest) -> Result<GatewayReceipt, GatewayError> {
        let reply = into_result(self.post("/operations/execute", req).await?)?;
        let reference = reply
            .reference
            .ok_or_else(|| GatewayError::Unavailable("gateway omitted the reference".into()))?;
        Ok(GatewayReceipt {
            reference,
            message: reply
                .message
                .unwrap_or_else(|| format!("{} completed", req.operation)),
        })
    }
}
