//! # vault-content
//!
//! Content handling for docvault: plaintext fingerprints, per-version
//! authenticated encryption, and key-addressed blob storage.
//!
//! ## Hash-Then-Encrypt Pattern
//!
//! ```text
//! Plaintext ──► SHA-256 ──► fileHash (ledger, integrity check on read)
//!     │
//!     └──► AES-256-GCM / XChaCha20-Poly1305 ──► Ciphertext ──► Blob Store
//!               ↑                                    │
//!        fresh key + nonce                     tag + nonce + key token
//!        (KeyProvider wraps key)               (EncryptionMetadata)
//! ```
//!
//! 1. Fingerprint the plaintext with SHA-256
//! 2. Generate a fresh 256-bit key and nonce for this version only
//! 3. Encrypt with a detached tag; the blob holds only the ciphertext body
//! 4. Hand the key to a [`KeyProvider`] and record the token in metadata
//! 5. On read: decrypt, then re-fingerprint and compare with the ledger
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vault_content::{fingerprint, CipherService, InlineKeyProvider};
//! use vault_types::CipherAlgorithm;
//!
//! let cipher = CipherService::new(CipherAlgorithm::Aes256Gcm, Arc::new(InlineKeyProvider));
//! let plaintext = b"Grade 9 mathematics textbook";
//! let encrypted = cipher.encrypt(plaintext)?;
//! let restored = cipher.open(&encrypted.ciphertext, &encrypted.metadata, &fingerprint(plaintext))?;
//! assert_eq!(restored, plaintext);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cipher;
mod error;
mod fs;
mod hash;
mod keys;
mod store;

pub use cipher::{CipherService, Encrypted, MAX_CONTENT_SIZE, TAG_SIZE};
pub use error::ContentError;
pub use fs::FsStore;
pub use hash::{fingerprint, verify_integrity};
pub use keys::{ContentKey, InlineKeyProvider, KeyProvider, SealedKeyProvider, CONTENT_KEY_SIZE};
pub use store::{BlobStore, MemoryStore};
