//! In-memory ledger for tests and embedding.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use vault_types::{ResourceId, StorageKey, VersionNumber, VersionRecord};

use super::{Ledger, VersionFilter};
use crate::error::{LedgerError, LedgerResult};

#[derive(Default)]
struct ResourceEntry {
    last_version: u64,
    records: BTreeMap<VersionNumber, VersionRecord>,
}

/// Ledger held in a concurrent map. Clones share state.
#[derive(Default, Clone)]
pub struct MemoryLedger {
    resources: Arc<DashMap<ResourceId, ResourceEntry>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all resources.
    pub fn len(&self) -> usize {
        self.resources.iter().map(|e| e.records.len()).sum()
    }

    /// Check if the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn next_version(&self, resource_id: &ResourceId) -> LedgerResult<VersionNumber> {
        let mut entry = self.resources.entry(resource_id.clone()).or_default();
        entry.last_version += 1;
        Ok(VersionNumber::new(entry.last_version))
    }

    async fn insert(&self, record: VersionRecord) -> LedgerResult<VersionRecord> {
        let mut entry = self.resources.entry(record.resource_id.clone()).or_default();
        if entry.records.contains_key(&record.version) {
            return Err(LedgerError::Duplicate {
                resource_id: record.resource_id.to_string(),
                version: record.version.value(),
            });
        }
        // Keep the counter ahead of anything inserted directly
        entry.last_version = entry.last_version.max(record.version.value());
        entry.records.insert(record.version, record.clone());
        Ok(record)
    }

    async fn find_by_resource(&self, resource_id: &ResourceId) -> LedgerResult<Vec<VersionRecord>> {
        Ok(self
            .resources
            .get(resource_id)
            .map(|entry| entry.records.values().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_version(
        &self,
        resource_id: &ResourceId,
        version: VersionNumber,
    ) -> LedgerResult<Option<VersionRecord>> {
        Ok(self
            .resources
            .get(resource_id)
            .and_then(|entry| entry.records.get(&version).cloned()))
    }

    async fn delete_many(&self, filter: &VersionFilter) -> LedgerResult<u64> {
        let Some(mut entry) = self.resources.get_mut(filter.resource_id()) else {
            return Ok(0);
        };

        let deleted = match filter {
            VersionFilter::Resource(_) => {
                let count = entry.records.len();
                entry.records.clear();
                count
            }
            VersionFilter::Versions { versions, .. } => versions
                .iter()
                .filter(|v| entry.records.remove(*v).is_some())
                .count(),
        };

        Ok(deleted as u64)
    }

    async fn storage_keys(&self) -> LedgerResult<HashSet<StorageKey>> {
        Ok(self
            .resources
            .iter()
            .flat_map(|entry| {
                entry
                    .records
                    .values()
                    .map(|r| r.storage_key.clone())
                    .collect::<Vec<_>>()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::make_record;

    fn rid(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    #[tokio::test]
    async fn counters_are_independent_per_resource() {
        let ledger = MemoryLedger::new();

        assert_eq!(ledger.next_version(&rid("a")).await.unwrap().value(), 1);
        assert_eq!(ledger.next_version(&rid("a")).await.unwrap().value(), 2);
        assert_eq!(ledger.next_version(&rid("b")).await.unwrap().value(), 1);
    }

    #[tokio::test]
    async fn insert_find_and_order() {
        let ledger = MemoryLedger::new();
        for v in [1, 3, 2] {
            ledger.insert(make_record(&rid("doc"), v)).await.unwrap();
        }

        let versions: Vec<u64> = ledger
            .find_by_resource(&rid("doc"))
            .await
            .unwrap()
            .iter()
            .map(|r| r.version.value())
            .collect();
        assert_eq!(versions, vec![3, 2, 1]);
        assert_eq!(ledger.len(), 3);

        // Counter moved past directly inserted versions
        assert_eq!(ledger.next_version(&rid("doc")).await.unwrap().value(), 4);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let ledger = MemoryLedger::new();
        ledger.insert(make_record(&rid("doc"), 1)).await.unwrap();

        let result = ledger.insert(make_record(&rid("doc"), 1)).await;
        assert!(matches!(result, Err(LedgerError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn delete_many_by_version_and_resource() {
        let ledger = MemoryLedger::new();
        for v in 1..=3 {
            ledger.insert(make_record(&rid("doc"), v)).await.unwrap();
        }

        let deleted = ledger
            .delete_many(&VersionFilter::Versions {
                resource_id: rid("doc"),
                versions: vec![VersionNumber::new(1)],
            })
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(ledger
            .find_version(&rid("doc"), VersionNumber::new(1))
            .await
            .unwrap()
            .is_none());

        let deleted = ledger
            .delete_many(&VersionFilter::Resource(rid("doc")))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(ledger.is_empty());
        assert_eq!(ledger.next_version(&rid("doc")).await.unwrap().value(), 4);
    }

    #[tokio::test]
    async fn delete_many_unknown_resource() {
        let ledger = MemoryLedger::new();
        let deleted = ledger
            .delete_many(&VersionFilter::Resource(rid("ghost")))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn storage_keys_cover_all_resources() {
        let ledger = MemoryLedger::new();
        let a = make_record(&rid("a"), 1);
        let b = make_record(&rid("b"), 2);
        ledger.insert(a.clone()).await.unwrap();
        ledger.insert(b.clone()).await.unwrap();

        let keys = ledger.storage_keys().await.unwrap();
        assert_eq!(keys, HashSet::from([a.storage_key, b.storage_key]));
    }
}
