//! Per-version authenticated encryption.
//!
//! This module provides:
//! - A fresh random key and nonce for every encryption (never reused)
//! - AES-256-GCM (default) or XChaCha20-Poly1305, detached tags
//! - Decrypt-then-verify against the plaintext fingerprint
//! - Key rotation (decrypt under the old key, re-encrypt under a new one)

use aes_gcm::{aead::AeadInPlace, aead::KeyInit, Aes256Gcm, Nonce};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use vault_types::{CipherAlgorithm, ContentHash, EncryptionMetadata};

use crate::error::ContentError;
use crate::hash;
use crate::keys::{ContentKey, KeyProvider};

/// Size of an AEAD authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Maximum content size for encryption (100 MB).
pub const MAX_CONTENT_SIZE: usize = 100 * 1024 * 1024;

/// Result of encrypting one version.
#[derive(Debug, Clone)]
pub struct Encrypted {
    /// Ciphertext body (the tag lives in `metadata`).
    pub ciphertext: Vec<u8>,
    /// Everything needed to decrypt `ciphertext`.
    pub metadata: EncryptionMetadata,
}

/// Symmetric cipher service bound to an algorithm and a key provider.
#[derive(Clone)]
pub struct CipherService {
    algorithm: CipherAlgorithm,
    keys: Arc<dyn KeyProvider>,
}

impl CipherService {
    /// Create a service that encrypts with `algorithm` and stores keys via `keys`.
    pub fn new(algorithm: CipherAlgorithm, keys: Arc<dyn KeyProvider>) -> Self {
        Self { algorithm, keys }
    }

    /// Algorithm used for new encryptions.
    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    /// Identifier of the key provider.
    pub fn key_provider(&self) -> &str {
        self.keys.id()
    }

    /// Encrypt `plaintext` under a freshly generated key and nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Encrypted, ContentError> {
        if plaintext.len() > MAX_CONTENT_SIZE {
            return Err(ContentError::EncryptionFailed(format!(
                "content too large: {} bytes (max {})",
                plaintext.len(),
                MAX_CONTENT_SIZE
            )));
        }

        let key = ContentKey::generate()?;
        let mut nonce = vec![0u8; self.algorithm.nonce_len()];
        getrandom::getrandom(&mut nonce)
            .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;

        let mut ciphertext = plaintext.to_vec();
        let tag = seal_in_place(self.algorithm, &key, &nonce, &mut ciphertext)?;

        let metadata = EncryptionMetadata {
            algorithm: self.algorithm,
            key_provider: self.keys.id().to_string(),
            key: self.keys.wrap(&key)?,
            nonce: hex::encode(&nonce),
            tag: hex::encode(tag),
            encrypted_at: unix_now(),
        };

        Ok(Encrypted {
            ciphertext,
            metadata,
        })
    }

    /// Decrypt `ciphertext` using its metadata.
    ///
    /// Returns `DecryptionFailed` if the tag does not verify; no plaintext is
    /// returned in that case.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        metadata: &EncryptionMetadata,
    ) -> Result<Vec<u8>, ContentError> {
        if metadata.key_provider != self.keys.id() {
            return Err(ContentError::KeyProviderMismatch {
                expected: self.keys.id().to_string(),
                actual: metadata.key_provider.clone(),
            });
        }

        let key = self.keys.unwrap(&metadata.key)?;
        let nonce = decode_exact(&metadata.nonce, metadata.algorithm.nonce_len(), "nonce")?;
        let tag = decode_exact(&metadata.tag, TAG_SIZE, "tag")?;

        let mut buffer = ciphertext.to_vec();
        open_in_place(metadata.algorithm, &key, &nonce, &tag, &mut buffer)?;
        Ok(buffer)
    }

    /// Decrypt and then check the plaintext against its recorded fingerprint.
    pub fn open(
        &self,
        ciphertext: &[u8],
        metadata: &EncryptionMetadata,
        expected: &ContentHash,
    ) -> Result<Vec<u8>, ContentError> {
        let plaintext = self.decrypt(ciphertext, metadata)?;
        let actual = hash::fingerprint(&plaintext);
        if actual != *expected {
            return Err(ContentError::HashMismatch {
                expected: expected.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(plaintext)
    }

    /// Recompute the fingerprint of `bytes` and compare with `expected`.
    pub fn verify_integrity(&self, bytes: &[u8], expected: &ContentHash) -> bool {
        hash::verify_integrity(bytes, expected)
    }

    /// Re-encrypt `ciphertext` under fresh key material.
    ///
    /// Fails exactly like [`CipherService::decrypt`] if the source does not
    /// authenticate.
    pub fn rotate_key(
        &self,
        ciphertext: &[u8],
        old_metadata: &EncryptionMetadata,
    ) -> Result<Encrypted, ContentError> {
        let plaintext = self.decrypt(ciphertext, old_metadata)?;
        let rotated = self.encrypt(&plaintext)?;
        tracing::info!(
            target: "docvault::audit",
            from_algorithm = %old_metadata.algorithm,
            to_algorithm = %rotated.metadata.algorithm,
            key_provider = %rotated.metadata.key_provider,
            "content key rotated"
        );
        Ok(rotated)
    }
}

impl std::fmt::Debug for CipherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherService")
            .field("algorithm", &self.algorithm)
            .field("key_provider", &self.keys.id())
            .finish()
    }
}

fn seal_in_place(
    algorithm: CipherAlgorithm,
    key: &ContentKey,
    nonce: &[u8],
    buffer: &mut [u8],
) -> Result<[u8; TAG_SIZE], ContentError> {
    let mut out = [0u8; TAG_SIZE];
    match algorithm {
        CipherAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;
            let tag = cipher
                .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", buffer)
                .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;
            out.copy_from_slice(&tag);
        }
        CipherAlgorithm::XChaCha20Poly1305 => {
            let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
                .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;
            let tag = cipher
                .encrypt_in_place_detached(XNonce::from_slice(nonce), b"", buffer)
                .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;
            out.copy_from_slice(&tag);
        }
    }
    Ok(out)
}

fn open_in_place(
    algorithm: CipherAlgorithm,
    key: &ContentKey,
    nonce: &[u8],
    tag: &[u8],
    buffer: &mut Vec<u8>,
) -> Result<(), ContentError> {
    let result = match algorithm {
        CipherAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|_| ContentError::DecryptionFailed)?;
            cipher.decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                buffer,
                aes_gcm::Tag::from_slice(tag),
            )
        }
        CipherAlgorithm::XChaCha20Poly1305 => {
            let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
                .map_err(|_| ContentError::DecryptionFailed)?;
            cipher.decrypt_in_place_detached(
                XNonce::from_slice(nonce),
                b"",
                buffer,
                chacha20poly1305::Tag::from_slice(tag),
            )
        }
    };

    result.map_err(|_| {
        buffer.clear();
        ContentError::DecryptionFailed
    })
}

fn decode_exact(hex_value: &str, len: usize, field: &str) -> Result<Vec<u8>, ContentError> {
    let bytes = hex::decode(hex_value)
        .map_err(|_| ContentError::InvalidMetadata(format!("{} is not hex", field)))?;
    if bytes.len() != len {
        return Err(ContentError::InvalidMetadata(format!(
            "{} must be {} bytes, got {}",
            field,
            len,
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
