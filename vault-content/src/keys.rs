//! Per-version key material and the providers that store it.
//!
//! Every version is encrypted under its own random [`ContentKey`]. What ends
//! up in the ledger is a *token* produced by a [`KeyProvider`]:
//! - [`InlineKeyProvider`] stores the raw key as hex, so anyone who can read
//!   the ledger can decrypt.
//! - [`SealedKeyProvider`] wraps the key under a key-encryption key derived
//!   from a master secret kept outside the ledger.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ContentError;

/// Size of a content encryption key in bytes (256 bits).
pub const CONTENT_KEY_SIZE: usize = 32;

/// Size of the nonce used when sealing a content key.
const WRAP_NONCE_SIZE: usize = 12;

/// Size of an AEAD tag.
const WRAP_TAG_SIZE: usize = 16;

/// A per-version symmetric key. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_SIZE]);

impl ContentKey {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Result<Self, ContentError> {
        let mut bytes = [0u8; CONTENT_KEY_SIZE];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; CONTENT_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// Capability that turns content keys into storable tokens and back.
pub trait KeyProvider: Send + Sync {
    /// Identifier recorded in encryption metadata.
    fn id(&self) -> &str;

    /// Produce a token for `key`.
    fn wrap(&self, key: &ContentKey) -> Result<String, ContentError>;

    /// Recover the key from a token produced by [`KeyProvider::wrap`].
    ///
    /// Returns `DecryptionFailed` if the token does not authenticate.
    fn unwrap(&self, token: &str) -> Result<ContentKey, ContentError>;
}

/// Stores the raw key as hex beside the ciphertext metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineKeyProvider;

impl InlineKeyProvider {
    /// Provider identifier.
    pub const ID: &'static str = "inline";
}

impl KeyProvider for InlineKeyProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn wrap(&self, key: &ContentKey) -> Result<String, ContentError> {
        Ok(hex::encode(key.as_bytes()))
    }

    fn unwrap(&self, token: &str) -> Result<ContentKey, ContentError> {
        let mut bytes = [0u8; CONTENT_KEY_SIZE];
        hex::decode_to_slice(token, &mut bytes)
            .map_err(|_| ContentError::InvalidMetadata("key is not 32 hex-encoded bytes".into()))?;
        Ok(ContentKey(bytes))
    }
}

/// Seals content keys with AES-256-GCM under a derived key-encryption key.
///
/// Token layout: `hex(nonce[12] || sealed_key[32] || tag[16])`.
pub struct SealedKeyProvider {
    kek: ContentKey,
}

impl SealedKeyProvider {
    /// Provider identifier.
    pub const ID: &'static str = "sealed-v1";

    /// Create a provider from a 32-byte master secret.
    pub fn new(master_secret: &[u8; 32]) -> Self {
        Self {
            kek: derive_key_encryption_key(master_secret),
        }
    }

    /// Parse a master secret from 64 hex characters (surrounding whitespace ignored).
    pub fn from_hex(master_hex: &str) -> Result<Self, ContentError> {
        let mut secret = [0u8; 32];
        hex::decode_to_slice(master_hex.trim(), &mut secret).map_err(|_| {
            ContentError::InvalidMetadata("master key must be 64 hex characters".into())
        })?;
        let provider = Self::new(&secret);
        secret.zeroize();
        Ok(provider)
    }

    fn cipher(&self) -> Result<Aes256Gcm, ContentError> {
        Aes256Gcm::new_from_slice(self.kek.as_bytes())
            .map_err(|e| ContentError::EncryptionFailed(e.to_string()))
    }
}

impl fmt::Debug for SealedKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedKeyProvider").finish_non_exhaustive()
    }
}

impl KeyProvider for SealedKeyProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn wrap(&self, key: &ContentKey) -> Result<String, ContentError> {
        let mut nonce = [0u8; WRAP_NONCE_SIZE];
        getrandom::getrandom(&mut nonce)
            .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;

        let sealed = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), key.as_bytes().as_slice())
            .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;

        let mut token = Vec::with_capacity(WRAP_NONCE_SIZE + sealed.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&sealed);
        Ok(hex::encode(token))
    }

    fn unwrap(&self, token: &str) -> Result<ContentKey, ContentError> {
        let raw = hex::decode(token)
            .map_err(|_| ContentError::InvalidMetadata("sealed key is not hex".into()))?;
        if raw.len() != WRAP_NONCE_SIZE + CONTENT_KEY_SIZE + WRAP_TAG_SIZE {
            return Err(ContentError::InvalidMetadata(format!(
                "sealed key has {} bytes",
                raw.len()
            )));
        }

        let (nonce, sealed) = raw.split_at(WRAP_NONCE_SIZE);
        let mut opened = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| ContentError::DecryptionFailed)?;

        let mut bytes = [0u8; CONTENT_KEY_SIZE];
        bytes.copy_from_slice(&opened);
        opened.zeroize();
        Ok(ContentKey(bytes))
    }
}

/// Derive the key-encryption key from a master secret.
///
/// Uses HKDF-SHA256 with salt `"docvault-kek-v1"` and info `"key-encryption"`.
fn derive_key_encryption_key(master_secret: &[u8; 32]) -> ContentKey {
    let hkdf = Hkdf::<Sha256>::new(Some(b"docvault-kek-v1"), master_secret);
    let mut kek = [0u8; CONTENT_KEY_SIZE];
    hkdf.expand(b"key-encryption", &mut kek)
        .expect("HKDF expand should not fail with valid lengths");
    ContentKey(kek)
}
