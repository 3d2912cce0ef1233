//! # vault-engine
//!
//! Encrypted, append-only document versioning.
//!
//! Every upload becomes a new immutable version: the plaintext is
//! fingerprinted, encrypted under fresh key material, written to a blob
//! store, and only then recorded in the ledger.
//!
//! ```text
//! create_version ──► lock(resource) ──► SHA-256 ──► encrypt ──► next_version
//!                                                                   │
//!                     ledger.insert ◄── store.put(<rid>/<hash>-v<n>)┘
//!
//! get_version ──► ledger.find_version ──► store.get ──► decrypt ──► re-hash
//! ```
//!
//! Reverting appends a copy of an old version; pruning drops the oldest
//! versions beyond a retention count. A background sweep removes blobs that
//! no record references.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vault_content::{CipherService, InlineKeyProvider, MemoryStore};
//! use vault_engine::VersioningEngine;
//! use vault_ledger::MemoryLedger;
//! use vault_types::{ChangeType, CipherAlgorithm, Resource, ResourceId, UploadedFile};
//!
//! let cipher = CipherService::new(CipherAlgorithm::Aes256Gcm, Arc::new(InlineKeyProvider));
//! let engine = VersioningEngine::new(MemoryStore::new(), MemoryLedger::new(), cipher);
//!
//! let mut resource = Resource::new(ResourceId::new("syllabus")?).with_modifier("author-7");
//! let file = UploadedFile::new(b"hello world".to_vec(), "text/plain");
//! let v1 = engine.create_version(&mut resource, &file, ChangeType::Create).await?;
//! let content = engine.get_version(&resource.id, v1.version).await?;
//! assert_eq!(content.content, b"hello world");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod engine;
mod error;
mod locks;
pub mod sweep;

pub use config::{Config, ConfigError};
pub use engine::{
    PruneFailure, PruneReport, SweepReport, VersionComparison, VersionContent, VersioningEngine,
};
pub use error::{VersionError, VersionResult};
pub use sweep::spawn_sweep_task;
