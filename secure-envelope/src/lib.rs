//! Authenticated Envelope Encryption
//!
//! Every encrypted payload that crosses the mobile channel is carried as a
//! single hex string:
//!
//! ```text
//! hex(nonce[12]) || hex(AES-GCM ciphertext || tag[16])
//! ```
//!
//! The key size selects the cipher (16 => AES-128-GCM, 24 => AES-192-GCM,
//! 32 => AES-256-GCM). A fresh nonce is drawn from the OS CSPRNG for every
//! call to [`encrypt`]; nonces are never derived or counted.
//!
//! # Example
//! ```
//! use secure_envelope::{EnvelopeKey, KeySize, decrypt, encrypt};
//!
//! let key = EnvelopeKey::generate(KeySize::Aes256);
//! let envelope = encrypt(b"{\"amount\":100}", key.as_bytes()).unwrap();
//! assert_eq!(decrypt(&envelope, key.as_bytes()).unwrap(), b"{\"amount\":100}");
//! ```

use std::fmt;

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Length of the hex-encoded nonce prefix.
pub const NONCE_HEX_LEN: usize = NONCE_LEN * 2;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Envelope failures.
///
/// `InvalidCiphertext` and `AuthenticationFailed` are deliberately terse:
/// callers at the HTTP boundary collapse both into one outward message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid key length: {0} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength(usize),

    #[error("invalid ciphertext")]
    InvalidCiphertext,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("encryption failed")]
    EncryptionFailed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Supported AES key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    Aes128,
    Aes192,
    Aes256,
}

impl KeySize {
    /// Key length in bytes.
    pub fn len(self) -> usize {
        match self {
            KeySize::Aes128 => 16,
            KeySize::Aes192 => 24,
            KeySize::Aes256 => 32,
        }
    }

    /// Maps a byte length to a key size.
    pub fn from_len(len: usize) -> Result<Self, EnvelopeError> {
        match len {
            16 => Ok(KeySize::Aes128),
            24 => Ok(KeySize::Aes192),
            32 => Ok(KeySize::Aes256),
            other => Err(EnvelopeError::InvalidKeyLength(other)),
        }
    }
}

/// Raw symmetric key bytes, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey(Vec<u8>);

impl EnvelopeKey {
    /// Wraps existing key bytes, rejecting anything that is not an AES key size.
    pub fn new(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        KeySize::from_len(bytes.len())?;
        Ok(Self(bytes.to_vec()))
    }

    /// Draws a fresh random key from the OS CSPRNG.
    pub fn generate(size: KeySize) -> Self {
        let mut bytes = vec![0u8; size.len()];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parses a hex-encoded key.
    pub fn from_hex(encoded: &str) -> Result<Self, EnvelopeError> {
        let mut bytes = hex::decode(encoded.trim())
            .map_err(|_| EnvelopeError::InvalidKeyLength(encoded.len() / 2))?;
        let key = Self::new(&bytes);
        bytes.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn size(&self) -> KeySize {
        // Length is validated on construction.
        KeySize::from_len(self.0.len()).unwrap_or(KeySize::Aes256)
    }

    /// Hex encoding of the key. Only for the one-time provisioning response.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Seals `plaintext` under this key. See [`encrypt`].
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, EnvelopeError> {
        encrypt(plaintext, &self.0)
    }

    /// Opens an envelope sealed under this key. See [`decrypt`].
    pub fn open(&self, envelope: &str) -> Result<Vec<u8>, EnvelopeError> {
        decrypt(envelope, &self.0)
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvelopeKey({:?}, <redacted>)", self.size())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cipher selection
// ─────────────────────────────────────────────────────────────────────────────

enum Cipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    fn new(key: &[u8]) -> Result<Self, EnvelopeError> {
        let invalid = |_| EnvelopeError::InvalidKeyLength(key.len());
        match KeySize::from_len(key.len())? {
            KeySize::Aes128 => Aes128Gcm::new_from_slice(key).map(Cipher::Aes128).map_err(invalid),
            KeySize::Aes192 => Aes192Gcm::new_from_slice(key).map(Cipher::Aes192).map_err(invalid),
            KeySize::Aes256 => Aes256Gcm::new_from_slice(key).map(Cipher::Aes256).map_err(invalid),
        }
    }

    fn seal(&self, nonce: &Nonce<U12>, plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Cipher::Aes128(c) => c.encrypt(nonce, plaintext),
            Cipher::Aes192(c) => c.encrypt(nonce, plaintext),
            Cipher::Aes256(c) => c.encrypt(nonce, plaintext),
        }
    }

    fn open(&self, nonce: &Nonce<U12>, ciphertext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Cipher::Aes128(c) => c.decrypt(nonce, ciphertext),
            Cipher::Aes192(c) => c.decrypt(nonce, ciphertext),
            Cipher::Aes256(c) => c.decrypt(nonce, ciphertext),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope operations
// ─────────────────────────────────────────────────────────────────────────────

/// Encrypts `plaintext` and returns `hex(nonce) || hex(ciphertext)`.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<String, EnvelopeError> {
    let cipher = Cipher::new(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let sealed = cipher
        .seal(&nonce, plaintext)
        .map_err(|_| EnvelopeError::EncryptionFailed)?;

    let mut out = String::with_capacity(NONCE_HEX_LEN + sealed.len() * 2);
    out.push_str(&hex::encode(nonce));
    out.push_str(&hex::encode(&sealed));
    Ok(out)
}

/// Decrypts an envelope produced by [`encrypt`].
///
/// Fails closed: a tag mismatch yields `AuthenticationFailed` and no bytes.
pub fn decrypt(envelope: &str, key: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = Cipher::new(key)?;

    let raw = hex::decode(envelope.trim()).map_err(|_| EnvelopeError::InvalidCiphertext)?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(EnvelopeError::InvalidCiphertext);
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    cipher
        .open(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| EnvelopeError::AuthenticationFailed)
}
