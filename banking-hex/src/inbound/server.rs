//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use banking_types::{
    AddBeneficiary, AddNominee, BankingRepository, BlockCard, ChangeLimit, Payment, ResetCardPin,
    ResetMpin, SetCardPin,
};

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::BankingService;

/// HTTP Server for the banking API.
pub struct HttpServer<R: BankingRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: BankingRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: BankingService<R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 60 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: BankingService<R>, requests_per_minute: u32) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::per_minute(requests_per_minute)),
        }
    }

    pub fn service(&self) -> &BankingService<R> {
        &self.state.service
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/admin/owners", post(handlers::provision_owner::<R>))
            .route(
                "/api/admin/owners/{id}/rotate",
                post(handlers::rotate_owner_key::<R>),
            )
            .route(
                "/api/beneficiaries",
                post(handlers::submit::<R, AddBeneficiary>),
            )
            .route("/api/payments", post(handlers::submit::<R, Payment>))
            .route("/api/cards/pin", post(handlers::submit::<R, SetCardPin>))
            .route(
                "/api/cards/pin/reset",
                post(handlers::submit::<R, ResetCardPin>),
            )
            .route("/api/cards/block", post(handlers::submit::<R, BlockCard>))
            .route("/api/cards/limits", post(handlers::submit::<R, ChangeLimit>))
            .route("/api/nominees", post(handlers::submit::<R, AddNominee>))
            .route("/api/mpin/reset", post(handlers::submit::<R, ResetMpin>))
            .route(
                "/api/intents/{identifier}",
                get(handlers::intent_status::<R>),
            )
            .route("/api/ifsc/validate", post(handlers::validate_ifsc::<R>))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
