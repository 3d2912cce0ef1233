//! # vault-ledger
//!
//! Durable, ordered record of versions per resource.
//!
//! The ledger owns two things:
//! - a per-resource version counter, advanced atomically so that two writers
//!   can never be handed the same version number, and
//! - the immutable [`VersionRecord`]s themselves, queried newest first.
//!
//! Counters are never rewound: pruning removes records but the next version
//! number keeps climbing.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod memory;
mod sqlite;

pub use error::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

use async_trait::async_trait;
use std::collections::HashSet;
use vault_types::{ResourceId, StorageKey, VersionNumber, VersionRecord};

/// Selects records for [`Ledger::delete_many`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionFilter {
    /// Every record of a resource.
    Resource(ResourceId),
    /// Specific versions of a resource.
    Versions {
        /// Owning resource.
        resource_id: ResourceId,
        /// Versions to remove.
        versions: Vec<VersionNumber>,
    },
}

impl VersionFilter {
    /// The resource this filter applies to.
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            VersionFilter::Resource(id) => id,
            VersionFilter::Versions { resource_id, .. } => resource_id,
        }
    }
}

/// Trait for version ledger backends.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Atomically reserve the next version number for a resource.
    ///
    /// Returns `1` for a resource never seen before. A reserved number is
    /// never handed out again, even if no record is ever written for it.
    async fn next_version(&self, resource_id: &ResourceId) -> LedgerResult<VersionNumber>;

    /// Append a record.
    ///
    /// Fails with `Duplicate` if the resource already has this version.
    async fn insert(&self, record: VersionRecord) -> LedgerResult<VersionRecord>;

    /// All surviving records of a resource, newest first.
    async fn find_by_resource(&self, resource_id: &ResourceId) -> LedgerResult<Vec<VersionRecord>>;

    /// A single record, if it exists.
    async fn find_version(
        &self,
        resource_id: &ResourceId,
        version: VersionNumber,
    ) -> LedgerResult<Option<VersionRecord>>;

    /// Remove matching records.
    ///
    /// Returns the number of records deleted.
    async fn delete_many(&self, filter: &VersionFilter) -> LedgerResult<u64>;

    /// Storage keys referenced by any record.
    async fn storage_keys(&self) -> LedgerResult<HashSet<StorageKey>>;
}
