//! Request and response codecs.
//!
//! Everything crossing the mobile channel is `{ "data": <envelope> }`. The
//! request path opens the envelope with the owner's key, deserializes into a
//! typed request and validates it; callers only ever see a fully validated
//! value. The response path is the mirror image under the same key.

use banking_types::{AppError, DomainError, EncryptedPayload, KeyMaterial, Validate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

/// Failure at the codec boundary.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Malformed or tampered envelope, or the wrong key. Deliberately opaque.
    #[error("Unable to decrypt payload")]
    Decryption,

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("Unable to encode response: {0}")]
    Encoding(String),
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decryption => AppError::DecryptionFailed,
            CodecError::Malformed(msg) => AppError::ValidationFailed(msg),
            CodecError::Invalid(e) => e.into(),
            CodecError::Encoding(msg) => AppError::Internal(msg),
        }
    }
}

/// Parses the outer `{ "data": ... }` body.
pub fn parse_envelope(body: &[u8]) -> Result<EncryptedPayload, CodecError> {
    serde_json::from_slice(body).map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Opens, deserializes and validates an encrypted request.
pub fn decode_request<T>(key: &KeyMaterial, body: &EncryptedPayload) -> Result<T, CodecError>
where
    T: DeserializeOwned + Validate,
{
    // Every envelope failure collapses into one outward error.
    let plaintext = Zeroizing::new(key.open(&body.data).map_err(|_| CodecError::Decryption)?);
    decode_plain(&plaintext)
}

/// Deserializes and validates a plaintext request.
pub fn decode_plain<T>(json: &[u8]) -> Result<T, CodecError>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_slice(json).map_err(|e| CodecError::Malformed(e.to_string()))?;
    value.validate()?;
    Ok(value)
}

/// Serializes a response and seals it under the owner's key.
pub fn encode_response<T: Serialize>(
    key: &KeyMaterial,
    value: &T,
) -> Result<EncryptedPayload, CodecError> {
    let plaintext =
        Zeroizing::new(serde_json::to_vec(value).map_err(|e| CodecError::Encoding(e.to_string()))?);
    let data = key
        .seal(&plaintext)
        .map_err(|e| CodecError::Encoding(e.to_string()))?;
    Ok(EncryptedPayload { data })
}
