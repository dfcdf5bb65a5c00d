//! Integration tests for rate limiting middleware.
//!
//! These tests verify the HTTP-level behavior of rate limiting,
//! including 429 responses and proper integration with the middleware stack.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use banking_hex::{BankingService, ServiceConfig, inbound::HttpServer};
use banking_repo::MemoryRepo;
use banking_types::{
    ExternalGateway, GatewayError, GatewayReceipt, GatewayRequest, OtpDispatch, ProvisionedOwner,
};
use http_body_util::BodyExt;
use secure_envelope::{EnvelopeKey, KeySize};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-test-token";

/// The rate limiter sits in front of the gateway; these tests never reach it.
struct UnreachableGateway;

#[async_trait]
impl ExternalGateway for UnreachableGateway {
    async fn issue_otp(&self, _req: &GatewayRequest) -> Result<OtpDispatch, GatewayError> {
        Err(GatewayError::Unavailable("not wired".into()))
    }

    async fn verify_otp(&self, _req: &GatewayRequest, _otp: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("not wired".into()))
    }

    async fn execute(&self, _req: &GatewayRequest) -> Result<GatewayReceipt, GatewayError> {
        Err(GatewayError::Unavailable("not wired".into()))
    }
}

/// Helper to create a test server with a very low rate limit.
fn create_test_server(requests_per_minute: u32) -> HttpServer<MemoryRepo> {
    let config = ServiceConfig::new(EnvelopeKey::generate(KeySize::Aes256), ADMIN_TOKEN);
    let service =
        BankingService::new(MemoryRepo::new(), Arc::new(UnreachableGateway), config).unwrap();
    HttpServer::with_rate_limit(service, requests_per_minute)
}

/// Helper to make a health check request.
fn health_request() -> Request<Body> {
    Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

/// Helper to provision an owner with the admin token.
fn provision_request() -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/admin/owners")
        .header("Authorization", format!("Bearer {}", ADMIN_TOKEN))
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"label": "test-device"}"#))
        .unwrap()
}

/// Helper to make an authenticated API request.
fn api_request(session_token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/ifsc/validate")
        .header("Authorization", format!("Bearer {}", session_token))
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"ifsc": "HDFC0001234"}"#))
        .unwrap()
}

/// Helper to provision an owner and extract its session token.
async fn session_token(app: axum::Router) -> String {
    let response = app.oneshot(provision_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let owner: ProvisionedOwner = serde_json::from_slice(&body).unwrap();
    owner.session_token
}

#[tokio::test]
async fn test_rate_limiting_returns_429_when_exceeded() {
    // Provisioning spends the admin token's quota, not the owner's.
    let server = create_test_server(3);
    let app = server.router();
    let token = session_token(app.clone()).await;

    for i in 1..=3 {
        let response = app.clone().oneshot(api_request(&token)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Request {} should not be rate limited (quota not yet exceeded)",
            i
        );
    }

    let response = app.clone().oneshot(api_request(&token)).await.unwrap();
    assert_eq!(
        response.status(),
        StatusCode::TOO_MANY_REQUESTS,
        "Request should be rate limited after exceeding quota"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "RATE_LIMITED");
    assert_eq!(json["code"], 429);
}

#[tokio::test]
async fn test_rate_limiting_health_endpoint_bypassed() {
    let server = create_test_server(1);
    let app = server.router();

    for _ in 0..10 {
        let response = app.clone().oneshot(health_request()).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Health endpoint should not be rate limited"
        );
    }
}

#[tokio::test]
async fn test_rate_limiting_per_token_isolation() {
    let server = create_test_server(2);
    let app = server.router();

    let token_a = session_token(app.clone()).await;
    let token_b = session_token(app.clone()).await;

    for _ in 0..2 {
        let response = app.clone().oneshot(api_request(&token_a)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.clone().oneshot(api_request(&token_a)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app.clone().oneshot(api_request(&token_b)).await.unwrap();
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Token B should have its own quota"
    );
}

#[tokio::test]
async fn test_rate_limiting_response_format() {
    let server = create_test_server(1);
    let app = server.router();
    let token = session_token(app.clone()).await;

    let _ = app.clone().oneshot(api_request(&token)).await;
    let response = app.clone().oneshot(api_request(&token)).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("application/json"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json.get("error").is_some(), "Response should have 'error' field");
    assert!(json.get("message").is_some(), "Response should have 'message' field");
}
