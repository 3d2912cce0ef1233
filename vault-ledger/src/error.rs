//! Error types for vault-ledger.

/// Ledger layer errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A record with this resource and version already exists.
    #[error("version {version} already recorded for resource {resource_id}")]
    Duplicate {
        /// The resource ID.
        resource_id: String,
        /// The conflicting version number.
        version: u64,
    },

    /// A stored row could not be decoded into a record.
    #[error("corrupt ledger row: {0}")]
    Corrupt(String),

    /// Encryption metadata could not be encoded or decoded.
    #[error("metadata encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
