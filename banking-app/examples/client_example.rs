//! Client example walking through an OTP-guarded beneficiary registration.
//!
//! Run with: cargo run -p banking-app --example client_example
//!
//! The bank is simulated in-process: it sends no SMS and accepts `123456`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use banking_client::BankingClient;
use banking_hex::{BankingService, ServiceConfig, inbound::HttpServer};
use banking_repo::build_repo;
use banking_types::{
    AddBeneficiary, ExternalGateway, GatewayError, GatewayReceipt, GatewayRequest, OtpDispatch,
};
use secure_envelope::{EnvelopeKey, KeySize};
use tempfile::tempdir;
use tokio::net::TcpListener;

const ADMIN_TOKEN: &str = "example-admin-token";
const OTP: &str = "123456";

struct SimulatedBank;

#[async_trait]
impl ExternalGateway for SimulatedBank {
    async fn issue_otp(&self, req: &GatewayRequest) -> Result<OtpDispatch, GatewayError> {
        println!("   [bank] OTP for {} sent", req.identifier);
        Ok(OtpDispatch {
            masked_destination: Some("XXXXXX4321".into()),
        })
    }

    async fn verify_otp(&self, _req: &GatewayRequest, otp: &str) -> Result<(), GatewayError> {
        if otp == OTP {
            Ok(())
        } else {
            Err(GatewayError::OtpMismatch)
        }
    }

    async fn execute(&self, req: &GatewayRequest) -> Result<GatewayReceipt, GatewayError> {
        println!("   [bank] executing {} {}", req.operation, req.identifier);
        Ok(GatewayReceipt {
            reference: format!("BNF-{}", &req.identifier.as_str()[..8]),
            message: "Beneficiary added".into(),
        })
    }
}

fn beneficiary() -> AddBeneficiary {
    AddBeneficiary {
        name: "Asha Rao".into(),
        ifsc: "HDFC0001234".into(),
        account_number: "50100012345678".into(),
        confirm_account_number: Some("50100012345678".into()),
        nickname: Some("Asha".into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let port = addr.port();
    drop(listener);

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("banking.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("Starting server on port {port}...");
    println!("   Database: {db_url}");

    let repo = build_repo(&db_url).await?;
    let config = ServiceConfig::new(EnvelopeKey::generate(KeySize::Aes256), ADMIN_TOKEN);
    let service = BankingService::new(repo, Arc::new(SimulatedBank), config)?;
    let router = HttpServer::new(service).router();

    let server_addr = format!("127.0.0.1:{port}");
    tokio::spawn(async move {
        let listener = TcpListener::bind(&server_addr).await.unwrap();
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let base_url = format!("http://127.0.0.1:{port}");

    // ─────────────────────────────────────────────────────────────────────────
    // Enrol a device
    // ─────────────────────────────────────────────────────────────────────────

    let admin = BankingClient::new(&base_url).with_token(ADMIN_TOKEN);
    println!("Server health: {}", admin.health().await?);

    let owner = admin.provision_owner("pixel-7").await?;
    println!("Provisioned owner {} (key v{})", owner.owner_id, owner.key_version);

    let client = BankingClient::for_owner(&base_url, &owner)?;

    // ─────────────────────────────────────────────────────────────────────────
    // Add a beneficiary
    // ─────────────────────────────────────────────────────────────────────────

    let lookup = client.validate_ifsc("HDFC0001234").await?;
    println!("IFSC {} -> bank {}, branch {}", lookup.ifsc, lookup.bank_code, lookup.branch_code);

    let issued = client.request_otp(beneficiary()).await?;
    println!(
        "OTP sent to {} for {} ({:?})",
        issued.otp_destination.as_deref().unwrap_or("registered device"),
        issued.txn_identifier,
        issued.status
    );

    let wrong = client
        .confirm_otp(beneficiary(), &issued.txn_identifier, "000000", false)
        .await;
    println!("Wrong OTP: {}", wrong.unwrap_err());

    let done = client
        .confirm_otp(beneficiary(), &issued.txn_identifier, OTP, true)
        .await?;
    println!("{}: {:?} ({:?})", done.message, done.status, done.reference);

    // A repeated confirmation replays the stored result.
    let replay = client
        .confirm_otp(beneficiary(), &issued.txn_identifier, OTP, true)
        .await?;
    assert_eq!(replay.reference, done.reference);
    println!("Replay returned the same reference");

    let view = client.intent_status(&issued.txn_identifier).await?;
    println!(
        "Intent {} is {} after {} OTP attempt(s)",
        view.txn_identifier, view.state, view.otp_attempts
    );

    // ─────────────────────────────────────────────────────────────────────────
    // Rotate the key
    // ─────────────────────────────────────────────────────────────────────────

    let rotated = admin.rotate_owner_key(owner.owner_id).await?;
    println!("Rotated key to v{}", rotated.key_version);

    let stale = client.intent_status(&issued.txn_identifier).await;
    println!("Old key after rotation: {}", stale.unwrap_err());

    Ok(())
}
