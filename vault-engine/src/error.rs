//! Error types for vault-engine.

use vault_content::ContentError;
use vault_ledger::LedgerError;

/// Errors returned by versioning operations.
///
/// Every variant means the operation left no partial state visible to the
/// caller: no record is returned and no plaintext is handed out.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    /// The ciphertext could not be stored; no ledger record was written.
    #[error("failed to write blob {key}: {source}")]
    StorageWrite {
        /// Blob key that was being written.
        key: String,
        /// Underlying store error.
        #[source]
        source: ContentError,
    },

    /// A blob the ledger references is missing or unreadable.
    #[error("failed to read blob {key}: {source}")]
    StorageRead {
        /// Blob key that was being read.
        key: String,
        /// Underlying store error.
        #[source]
        source: ContentError,
    },

    /// The ledger rejected a write.
    #[error("ledger write failed for resource {resource_id}: {source}")]
    LedgerWrite {
        /// Resource being written.
        resource_id: String,
        /// Underlying ledger error.
        #[source]
        source: LedgerError,
    },

    /// The ledger could not be queried.
    #[error("ledger read failed: {0}")]
    LedgerRead(#[source] LedgerError),

    /// The requested version does not exist (or was pruned).
    #[error("version {version} of resource {resource_id} not found")]
    VersionNotFound {
        /// Resource that was queried.
        resource_id: String,
        /// Missing version number.
        version: u64,
    },

    /// Authentication tag or plaintext digest did not verify.
    #[error("integrity check failed for resource {resource_id} version {version}")]
    Integrity {
        /// Resource that was read.
        resource_id: String,
        /// Version that failed verification.
        version: u64,
        /// Underlying cipher error.
        #[source]
        source: ContentError,
    },

    /// Plaintext could not be encrypted.
    #[error("encryption failed: {0}")]
    Encryption(#[source] ContentError),
}

impl VersionError {
    /// Whether the failure is security relevant and must never be retried.
    pub fn is_integrity(&self) -> bool {
        matches!(self, VersionError::Integrity { .. })
    }
}

/// Result type alias for versioning operations.
pub type VersionResult<T> = std::result::Result<T, VersionError>;
