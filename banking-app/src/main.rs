//! # Banking Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter and the gateway client
//! - Create the banking service
//! - Start the intent sweeper and the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use banking_hex::{BankingService, CoordinatorConfig, ServiceConfig, inbound::HttpServer};
use banking_repo::{build_repo, gateway::HttpGateway, sweeper::IntentSweeper};

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("banking-middleware"), provider))
}

/// Meter provider read by the HTTP metrics layer.
fn init_meter() -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .build();

    global::set_meter_provider(provider.clone());
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing and metrics
    let (otel_tracer, otel_provider) = init_tracer()?;
    let meter_provider = init_meter()?;
    let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,banking_app=debug,banking_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting banking middleware on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);
    tracing::info!(
        gateway = %config.gateway_url,
        signed = config.gateway_secret.is_some(),
        "Using external gateway"
    );

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!("Repository backend: {}", repo.backend());

    let gateway = HttpGateway::new(
        &config.gateway_url,
        config.gateway_timeout,
        config.gateway_secret.clone(),
    )?;

    let mut service_config = ServiceConfig::new(config.master_key, config.admin_token);
    service_config.identifier_length = config.txn_id_length;
    service_config.coordinator = CoordinatorConfig {
        intent_ttl: config.intent_ttl,
        max_otp_attempts: config.otp_max_attempts,
        gateway_timeout: config.gateway_timeout,
    };

    // Create the banking service
    let service = BankingService::new(repo, Arc::new(gateway), service_config)?;

    // Purge stale intents in the background
    let sweeper = IntentSweeper::new(
        service.repo().clone(),
        config.sweep_interval,
        config.intent_retention,
    );
    tokio::spawn(sweeper.run());

    // Create and run the HTTP server
    let server = HttpServer::with_rate_limit(service, config.rate_limit_per_minute);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces and metrics are flushed before exit
    let _ = otel_provider.shutdown();
    let _ = meter_provider.shutdown();
    Ok(())
}
