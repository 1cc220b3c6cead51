//! AES-GCM encryption for integration tokens.
//!
//! Each token is encrypted with a fresh random nonce. The nonce is prepended
//! to the ciphertext so a stored blob is self-contained apart from the key:
//!
//! ```text
//! ┌────────────┬──────────────────────────────┐
//! │ nonce (12) │ ciphertext + GCM tag (n + 16) │
//! └────────────┴──────────────────────────────┘
//! ```
//!
//! AES-128, AES-192 or AES-256 is selected by the key length.

use aes_gcm::{
    aead::{consts::U12, Aead, AeadCore, KeyInit, OsRng},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Accepted key sizes in bytes (AES-128 / AES-192 / AES-256)
pub const VALID_KEY_SIZES: [usize; 3] = [16, 24, 32];

/// Size of the nonce in bytes (96 bits, standard for GCM)
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Errors raised by the token cipher.
///
/// Messages never include plaintext, key material or ciphertext bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encryption key must be 16, 24 or 32 bytes, got {0} bytes")]
    InvalidKeyLength(usize),

    #[error("Encryption key is not valid base64")]
    InvalidKeyEncoding,

    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed: {0}")]
    Decryption(&'static str),
}

/// Process-wide encryption key.
///
/// Loaded once at startup and never derived from request input. `Debug`
/// is redacted so the key cannot leak through logging.
#[derive(Clone)]
pub struct CipherKey(Vec<u8>);

impl CipherKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        if !VALID_KEY_SIZES.contains(&bytes.len()) {
            return Err(CipherError::InvalidKeyLength(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Decode a base64 key as supplied through the environment.
    pub fn from_base64(key_base64: &str) -> Result<Self, CipherError> {
        let bytes = BASE64
            .decode(key_base64.trim())
            .map_err(|_| CipherError::InvalidKeyEncoding)?;
        Self::from_bytes(&bytes)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CipherKey(<{} bytes redacted>)", self.0.len())
    }
}

enum Gcm {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

/// Symmetric cipher bound to one [`CipherKey`].
///
/// Constructed once and shared (`Arc<TokenCipher>`) for the process lifetime.
pub struct TokenCipher {
    gcm: Gcm,
}

impl TokenCipher {
    pub fn new(key: &CipherKey) -> Result<Self, CipherError> {
        let invalid = |_| CipherError::InvalidKeyLength(key.len());
        let gcm = match key.len() {
            16 => Gcm::Aes128(Aes128Gcm::new_from_slice(&key.0).map_err(invalid)?),
            24 => Gcm::Aes192(Aes192Gcm::new_from_slice(&key.0).map_err(invalid)?),
            _ => Gcm::Aes256(Aes256Gcm::new_from_slice(&key.0).map_err(invalid)?),
        };
        Ok(Self { gcm })
    }

    /// Encrypts `plaintext`, returning `nonce || ciphertext`.
    ///
    /// The same plaintext encrypted twice yields different blobs.
    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CipherError> {
        // Generate random nonce (never reuse!)
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = match &self.gcm {
            Gcm::Aes128(c) => c.encrypt(&nonce, plaintext.as_bytes()),
            Gcm::Aes192(c) => c.encrypt(&nonce, plaintext.as_bytes()),
            Gcm::Aes256(c) => c.encrypt(&nonce, plaintext.as_bytes()),
        }
        .map_err(|_| CipherError::Encryption)?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypts a blob produced by [`TokenCipher::encrypt`].
    pub fn decrypt(&self, blob: &[u8]) -> Result<String, CipherError> {
        if blob.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::Decryption("ciphertext too short"));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = match &self.gcm {
            Gcm::Aes128(c) => c.decrypt(nonce, ciphertext),
            Gcm::Aes192(c) => c.decrypt(nonce, ciphertext),
            Gcm::Aes256(c) => c.decrypt(nonce, ciphertext),
        }
        .map_err(|_| CipherError::Decryption("wrong key or corrupted data"))?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Decryption("plaintext is not valid UTF-8"))
    }

    /// Encrypts and renders the blob as base64, the at-rest column format.
    pub fn encrypt_to_text(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(BASE64.encode(self.encrypt(plaintext)?))
    }

    /// Inverse of [`TokenCipher::encrypt_to_text`].
    pub fn decrypt_text(&self, encoded: &str) -> Result<String, CipherError> {
        let blob = BASE64
            .decode(encoded)
            .map_err(|_| CipherError::Decryption("ciphertext is not valid base64"))?;
        self.decrypt(&blob)
    }
}

/// One-shot encryption with a raw key.
///
/// Fails with [`CipherError::InvalidKeyLength`] if `key` is not 16, 24 or 32 bytes.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let key = CipherKey::from_bytes(key)?;
    TokenCipher::new(&key)?.encrypt(plaintext)
}

/// One-shot decryption with a raw key. A wrong-sized key is a decryption failure.
pub fn decrypt(blob: &[u8], key: &[u8]) -> Result<String, CipherError> {
    let key = CipherKey::from_bytes(key).map_err(|_| CipherError::Decryption("invalid key size"))?;
    TokenCipher::new(&key)
        .map_err(|_| CipherError::Decryption("invalid key size"))?
        .decrypt(blob)
}
