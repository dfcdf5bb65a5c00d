//! Security utilities: session tokens, key wrapping and gateway request signing.

use rand::Rng;
use rand::distr::Alphanumeric;
use secure_envelope::{EnvelopeError, EnvelopeKey};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const SESSION_TOKEN_PREFIX: &str = "st_";
const SESSION_TOKEN_LEN: usize = 40;

/// Generates a fresh bearer token for a newly provisioned owner.
pub fn generate_session_token() -> String {
    let body: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", SESSION_TOKEN_PREFIX, body)
}

/// Hashes a session token using SHA-256.
pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Verifies a session token against a stored hash using constant-time comparison.
pub fn verify_session_token(input: &str, stored_hash: &str) -> bool {
    let input_hash = hash_session_token(input);
    input_hash.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Compares two secrets in constant time.
pub fn secrets_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Seals an owner key under the master key for storage at rest.
pub fn wrap_key(master: &EnvelopeKey, key: &EnvelopeKey) -> Result<String, EnvelopeError> {
    master.seal(key.as_bytes())
}

/// Opens a stored owner key with the master key.
pub fn unwrap_key(master: &EnvelopeKey, wrapped: &str) -> Result<EnvelopeKey, EnvelopeError> {
    let bytes = Zeroizing::new(master.open(wrapped)?);
    EnvelopeKey::new(&bytes)
}

/// Signs an outbound gateway request body using HMAC-SHA256.
pub fn sign_gateway_request(body: &[u8], secret: &str) -> String {
    use hmac::{Hmac, Mac};

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
