//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vault_content::{BlobStore, CipherService, ContentError, InlineKeyProvider, MemoryStore};
use vault_engine::VersioningEngine;
use vault_ledger::{Ledger, LedgerError, LedgerResult, MemoryLedger, VersionFilter};
use vault_types::{
    CipherAlgorithm, ResourceId, StorageKey, UploadedFile, VersionNumber, VersionRecord,
};

pub type MemoryEngine = VersioningEngine<MemoryStore, MemoryLedger>;

pub fn cipher() -> CipherService {
    CipherService::new(CipherAlgorithm::Aes256Gcm, Arc::new(InlineKeyProvider))
}

pub fn memory_engine() -> MemoryEngine {
    VersioningEngine::new(MemoryStore::new(), MemoryLedger::new(), cipher())
}

pub fn rid(s: &str) -> ResourceId {
    ResourceId::new(s).unwrap()
}

pub fn text(body: &str) -> UploadedFile {
    UploadedFile::new(body.as_bytes().to_vec(), "text/plain")
}

pub fn versions(records: &[VersionRecord]) -> Vec<u64> {
    records.iter().map(|r| r.version.value()).collect()
}

/// Blob store wrapper with injectable failures.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_next_put: Arc<AtomicBool>,
    fail_deletes: Arc<Mutex<HashSet<StorageKey>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, key: &StorageKey) {
        self.fail_deletes.lock().unwrap().insert(key.clone());
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn put(&self, key: &StorageKey, bytes: &[u8]) -> Result<(), ContentError> {
        if self.fail_next_put.swap(false, Ordering::SeqCst) {
            return Err(ContentError::StoreError("disk full".into()));
        }
        self.inner.put(key, bytes).await
    }

    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>, ContentError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ContentError> {
        if self.fail_deletes.lock().unwrap().contains(key) {
            return Err(ContentError::StoreError("permission denied".into()));
        }
        self.inner.delete(key).await
    }

    async fn contains(&self, key: &StorageKey) -> Result<bool, ContentError> {
        self.inner.contains(key).await
    }

    async fn list_keys(&self) -> Result<Vec<StorageKey>, ContentError> {
        self.inner.list_keys().await
    }
}

/// Ledger wrapper with injectable failures.
#[derive(Clone, Default)]
pub struct FlakyLedger {
    inner: MemoryLedger,
    fail_next_insert: Arc<AtomicBool>,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryLedger {
        &self.inner
    }

    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Ledger for FlakyLedger {
    async fn next_version(&self, resource_id: &ResourceId) -> LedgerResult<VersionNumber> {
        self.inner.next_version(resource_id).await
    }

    async fn insert(&self, record: VersionRecord) -> LedgerResult<VersionRecord> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Corrupt("injected insert failure".into()));
        }
        self.inner.insert(record).await
    }

    async fn find_by_resource(&self, resource_id: &ResourceId) -> LedgerResult<Vec<VersionRecord>> {
        self.inner.find_by_resource(resource_id).await
    }

    async fn find_version(
        &self,
        resource_id: &ResourceId,
        version: VersionNumber,
    ) -> LedgerResult<Option<VersionRecord>> {
        self.inner.find_version(resource_id, version).await
    }

    async fn delete_many(&self, filter: &VersionFilter) -> LedgerResult<u64> {
        self.inner.delete_many(filter).await
    }

    async fn storage_keys(&self) -> LedgerResult<HashSet<StorageKey>> {
        self.inner.storage_keys().await
    }
}
