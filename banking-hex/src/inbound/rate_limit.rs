//! Rate limiting middleware using Governor.
//!
//! One token bucket per bearer token. OTP endpoints are the brute-force
//! target, so the bucket is shared by every route a session can call.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use banking_repo::security::hash_session_token;
use banking_types::AppError;
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::{num::NonZeroU32, sync::Arc};

use super::handlers::ApiError;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    /// Per-token rate limiters, keyed by token hash
    limiters: DashMap<String, Arc<DirectLimiter>>,
    /// Quota for new tokens
    quota: Quota,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::per_minute(60)
    }
}

impl RateLimiterState {
    /// Allows a burst of `requests`, refilled evenly over a minute.
    pub fn per_minute(requests: u32) -> Self {
        let requests = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        Self {
            limiters: DashMap::new(),
            quota: Quota::per_minute(requests),
        }
    }

    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, token: &str) -> bool {
        let limiter = self
            .limiters
            .entry(hash_session_token(token))
            .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)))
            .clone();

        limiter.check().is_ok()
    }
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let key = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim_start_matches("Bearer ").to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&key) {
        tracing::warn!("Rate limit exceeded");
        return ApiError(AppError::RateLimited).into_response();
    }

    next.run(request).await
}
