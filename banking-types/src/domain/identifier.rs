//! Transaction identifiers.
//!
//! The identifier is the de-duplication token the downstream bank uses to
//! recognise repeated submissions of one logical operation, so it has to be
//! unique across concurrent callers and unpredictable.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Shortest identifier the generator will produce.
pub const MIN_GENERATED_LENGTH: usize = 20;

/// Longest identifier accepted anywhere.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Shortest caller-supplied identifier accepted.
pub const MIN_SUPPLIED_LENGTH: usize = 8;

const TIMESTAMP_HEX_LEN: usize = 12;

/// A validated transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnIdentifier(String);

impl TxnIdentifier {
    /// Validates a caller-supplied identifier.
    ///
    /// Accepts 8 to 64 characters of ASCII alphanumerics or `-`.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.len() < MIN_SUPPLIED_LENGTH || raw.len() > MAX_IDENTIFIER_LENGTH {
            return Err(DomainError::ValidationError(format!(
                "txn_identifier must be {}-{} characters",
                MIN_SUPPLIED_LENGTH, MAX_IDENTIFIER_LENGTH
            )));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomainError::ValidationError(
                "txn_identifier may only contain letters, digits and '-'".into(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxnIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TxnIdentifier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Source of fresh transaction identifiers.
///
/// Injected into the coordinator so tests can supply deterministic values.
pub trait IdentifierGenerator: Send + Sync + 'static {
    fn new_identifier(&self) -> TxnIdentifier;
}

/// Timestamp prefix followed by random UUIDv4 bytes, as uppercase hex.
///
/// The first 12 characters are the millisecond Unix timestamp, which keeps
/// identifiers roughly time-ordered in bank-side logs; everything after the
/// prefix comes from the OS CSPRNG.
#[derive(Debug, Clone)]
pub struct RandomIdentifierGenerator {
    length: usize,
}

impl RandomIdentifierGenerator {
    /// Creates a generator producing identifiers of exactly `length` characters.
    pub fn new(length: usize) -> Result<Self, DomainError> {
        if !(MIN_GENERATED_LENGTH..=MAX_IDENTIFIER_LENGTH).contains(&length) {
            return Err(DomainError::ValidationError(format!(
                "identifier length must be between {} and {}",
                MIN_GENERATED_LENGTH, MAX_IDENTIFIER_LENGTH
            )));
        }
        Ok(Self { length })
    }
}

impl Default for RandomIdentifierGenerator {
    fn default() -> Self {
        Self { length: 35 }
    }
}

impl IdentifierGenerator for RandomIdentifierGenerator {
    fn new_identifier(&self) -> TxnIdentifier {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let mut out = format!("{:0width$X}", millis, width = TIMESTAMP_HEX_LEN);
        // Keep the low-order digits if the clock ever outgrows the prefix.
        if out.len() > TIMESTAMP_HEX_LEN {
            out = out.split_off(out.len() - TIMESTAMP_HEX_LEN);
        }

        while out.len() < self.length {
            out.push_str(&hex::encode_upper(Uuid::new_v4().as_bytes()));
        }
        out.truncate(self.length);

        TxnIdentifier(out)
    }
}
