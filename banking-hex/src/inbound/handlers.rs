//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use banking_types::{
    AppError, BankingRepository, EncryptedPayload, ErrorBody, OperationRequest, Owner, OwnerId,
    ProvisionOwnerRequest,
};

use crate::BankingService;

/// Application state shared across handlers.
pub struct AppState<R: BankingRepository> {
    pub service: BankingService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self.0 {
            AppError::Fatal(_) | AppError::Internal(_) => {
                tracing::error!(error = %self.0, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message,
            code: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────────────────────────

/// Enrol a device owner. The response is the only copy of its token and key.
#[tracing::instrument(skip(state, req))]
pub async fn provision_owner<R: BankingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<ProvisionOwnerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let provisioned = state.service.provision_owner(req).await?;
    Ok((StatusCode::CREATED, Json(provisioned)))
}

/// Replace an owner's signing key.
#[tracing::instrument(skip(state), fields(owner_id = %id))]
pub async fn rotate_owner_key<R: BankingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id: OwnerId = id
        .parse()
        .map_err(|_| AppError::ValidationFailed("Invalid owner ID".into()))?;

    let rotated = state.service.rotate_owner_key(owner_id).await?;
    Ok(Json(rotated))
}

// ─────────────────────────────────────────────────────────────────────────────
// OTP-guarded operations
// ─────────────────────────────────────────────────────────────────────────────

/// Encrypted OTP-guarded submission of operation `T`.
#[tracing::instrument(skip_all, fields(owner_id = %owner.id, operation = %T::KIND))]
pub async fn submit<R: BankingRepository, T: OperationRequest>(
    State(state): State<Arc<AppState<R>>>,
    Extension(owner): Extension<Owner>,
    body: Bytes,
) -> Result<Json<EncryptedPayload>, ApiError> {
    let sealed = state.service.submit_sealed::<T>(&owner, &body).await?;
    Ok(Json(sealed))
}

/// Encrypted read of one of the caller's intents.
#[tracing::instrument(skip(state, owner), fields(owner_id = %owner.id))]
pub async fn intent_status<R: BankingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(owner): Extension<Owner>,
    Path(identifier): Path<String>,
) -> Result<Json<EncryptedPayload>, ApiError> {
    let sealed = state.service.intent_status(&owner, &identifier).await?;
    Ok(Json(sealed))
}

// ─────────────────────────────────────────────────────────────────────────────
// Plaintext reads
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all)]
pub async fn validate_ifsc<R: BankingRepository>(
    State(state): State<Arc<AppState<R>>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = state.service.validate_ifsc(&body)?;
    Ok(Json(lookup))
}
