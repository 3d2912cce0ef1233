//! Error types for docvault data model parsing.

use thiserror::Error;

/// Errors raised while parsing or validating model values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    /// Resource identifier failed validation
    #[error("invalid resource id {id:?}: {reason}")]
    InvalidResourceId {
        /// The rejected identifier.
        id: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Digest was not 64 hex characters
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// Unknown change type discriminator
    #[error("unknown change type: {0}")]
    UnknownChangeType(String),

    /// Unknown cipher algorithm identifier
    #[error("unknown cipher algorithm: {0}")]
    UnknownAlgorithm(String),
}
