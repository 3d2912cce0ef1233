//! # vault-types
//!
//! Data model types for the docvault encrypted document versioning engine.
//!
//! This crate provides the foundational types used across all docvault crates:
//! - [`ResourceId`], [`VersionNumber`], [`ContentHash`], [`StorageKey`] - Identity and ordering types
//! - [`VersionRecord`] - Immutable ledger entry for one historical state of a resource
//! - [`EncryptionMetadata`] - Everything needed to decrypt one version's blob
//! - [`Resource`] - Caller-owned pointer fields the engine reads and advances
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod record;

pub use error::TypesError;
pub use ids::{ContentHash, ResourceId, StorageKey, VersionNumber};
pub use record::{
    ChangeType, CipherAlgorithm, EncryptionMetadata, Resource, UploadedFile, VersionMetadata,
    VersionRecord,
};
