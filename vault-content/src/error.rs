//! Error types for vault-content.

use thiserror::Error;

/// Errors that can occur during hashing, encryption and blob storage.
#[derive(Error, Debug)]
pub enum ContentError {
    /// Encryption operation failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (authentication error).
    /// No details provided to prevent timing attacks.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Encryption metadata is malformed (bad hex, wrong lengths).
    #[error("invalid encryption metadata: {0}")]
    InvalidMetadata(String),

    /// Metadata was produced by a different key provider.
    #[error("key provider mismatch: expected {expected}, got {actual}")]
    KeyProviderMismatch {
        /// Provider configured on this service.
        expected: String,
        /// Provider named in the metadata.
        actual: String,
    },

    /// Plaintext digest verification failed.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Expected hash (hex-encoded).
        expected: String,
        /// Actual hash (hex-encoded).
        actual: String,
    },

    /// Blob not found in store.
    #[error("blob not found: {key}")]
    NotFound {
        /// Key of the missing blob.
        key: String,
    },

    /// Key cannot be mapped onto the store's namespace.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    StoreError(String),
}

impl ContentError {
    /// Whether this error means the data could not be authenticated.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            ContentError::DecryptionFailed
                | ContentError::InvalidMetadata(_)
                | ContentError::KeyProviderMismatch { .. }
                | ContentError::HashMismatch { .. }
        )
    }
}
