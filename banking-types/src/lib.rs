//! # Banking Types
//!
//! Domain types and port traits for the secure mobile-banking middleware.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Owners, key material, transaction intents, identifiers
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Typed operation requests and responses crossing the envelope
//! - `error/` - Domain, repository, gateway and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    FailureStage, IdentifierGenerator, IntentState, KeyMaterial, OperationKind, Owner, OwnerId,
    RandomIdentifierGenerator, TransactionIntent, TxnIdentifier, WrappedKey,
};
pub use dto::*;
pub use error::{AppError, DomainError, GatewayError, RepoError};
pub use ports::{
    BankingRepository, ExternalGateway, GatewayReceipt, GatewayRequest, IntentRepository,
    OtpDispatch, OwnerRepository,
};
