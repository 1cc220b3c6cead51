//! Protection of third-party integration tokens.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       IntegrationManager                 │
//! │  - only caller of the cipher             │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!    (encrypt)        (decrypt → mask_token)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       TokenCipher                        │
//! │  - AES-GCM, 128/192/256 by key length    │
//! │  - random nonce prepended to every blob  │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       IntegrationStore (SQLite)          │
//! │  - base64 blob in token_encrypted        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use groupsync::credentials::{mask_token, CipherKey, TokenCipher};
//!
//! # fn main() -> anyhow::Result<()> {
//! let key = CipherKey::from_base64(&std::env::var("GROUPSYNC_ENCRYPTION_KEY")?)?;
//! let cipher = TokenCipher::new(&key)?;
//!
//! let stored = cipher.encrypt_to_text("ghp_aaaaaaaaaaaaaaaa1234")?;
//! let shown = mask_token(&cipher.decrypt_text(&stored)?);
//! assert_eq!(shown, "****1234");
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - Key is held in memory only and never logged (`CipherKey` has a redacted `Debug`)
//! - Each encryption uses a unique nonce, so equal tokens produce unequal blobs
//! - Authenticated encryption: tampered blobs fail to decrypt

mod encryption;
mod mask;

pub use encryption::{
    decrypt, encrypt, CipherError, CipherKey, TokenCipher, NONCE_SIZE, VALID_KEY_SIZES,
};
pub use mask::mask_token;
