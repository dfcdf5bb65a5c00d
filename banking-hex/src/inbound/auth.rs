//! Authentication middleware.
//!
//! - `/health` is open.
//! - `/api/admin/*` requires the admin token.
//! - everything else requires an owner session token; the resolved [`Owner`]
//!   is stored in request extensions and is the only source of the owner
//!   identity used for key lookup.
//!
//! [`Owner`]: banking_types::Owner

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use banking_types::{AppError, BankingRepository};

use super::handlers::{ApiError, AppState};

/// Extracts the bearer token from the Authorization header.
/// Expected format: "Bearer <token>" or just "<token>"
fn extract_token(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!token.is_empty()).then_some(token)
}

pub async fn auth_middleware<R: BankingRepository>(
    State(state): State<Arc<AppState<R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if path == "/health" {
        return next.run(request).await;
    }

    let token = match extract_token(
        request
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok()),
    ) {
        Some(token) => token.to_string(),
        None => {
            return ApiError(AppError::Unauthenticated(
                "Missing or invalid Authorization header".into(),
            ))
            .into_response();
        }
    };

    if path.starts_with("/api/admin/") {
        if !state.service.is_admin(&token) {
            return ApiError(AppError::Forbidden("Admin token required".into())).into_response();
        }
        return next.run(request).await;
    }

    match state.service.authenticate(&token).await {
        Ok(owner) => {
            request.extensions_mut().insert(owner);
            next.run(request).await
        }
        Err(e) => {
            if !matches!(e, AppError::Unauthenticated(_)) {
                tracing::error!("Session token verification failed: {}", e);
            }
            ApiError(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_bearer() {
        assert_eq!(extract_token(Some("Bearer st_abc123")), Some("st_abc123"));
    }

    #[test]
    fn test_extract_token_raw() {
        assert_eq!(extract_token(Some("st_abc123")), Some("st_abc123"));
    }

    #[test]
    fn test_extract_token_missing_or_blank() {
        assert_eq!(extract_token(None), None);
        assert_eq!(extract_token(Some("Bearer ")), None);
        assert_eq!(extract_token(Some("   ")), None);
    }
}
