//! Domain models for the banking middleware.

pub mod identifier;
pub mod intent;
pub mod key_material;
pub mod owner;

pub use identifier::{IdentifierGenerator, RandomIdentifierGenerator, TxnIdentifier};
pub use intent::{FailureStage, IntentState, OperationKind, TransactionIntent};
pub use key_material::{KeyMaterial, WrappedKey};
pub use owner::{Owner, OwnerId};
