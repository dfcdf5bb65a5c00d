//! # Banking Hex
//!
//! Application service layer and HTTP adapter for the banking middleware.
//!
//! ## Architecture
//!
//! - `keys/` - Owner key material (provision, unwrap, rotate)
//! - `codec/` - Request/response envelopes and boundary validation
//! - `coordinator/` - OTP-guarded transaction state machine
//! - `service/` - Application service (orchestrates the above)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: BankingRepository`, allowing
//! different repository implementations to be injected.

pub mod codec;
pub mod coordinator;
pub mod inbound;
pub mod keys;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use coordinator::{CoordinatorConfig, OtpTransactionCoordinator};
pub use service::{BankingService, ServiceConfig};
