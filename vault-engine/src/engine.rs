//! The versioning engine.
//!
//! Writes to one resource are serialized by a per-resource lock; the version
//! number is reserved from the ledger's counter inside that lock. Reads take
//! no lock at all: records are immutable and blobs are written before the
//! record that points at them becomes visible.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use vault_content::{fingerprint, BlobStore, CipherService, ContentError};
use vault_ledger::{Ledger, VersionFilter};
use vault_types::{
    ChangeType, ContentHash, Resource, ResourceId, StorageKey, UploadedFile, VersionMetadata,
    VersionNumber, VersionRecord,
};

use crate::error::{VersionError, VersionResult};
use crate::locks::ResourceLocks;

/// Decrypted, verified content of one version.
#[derive(Clone, PartialEq, Eq)]
pub struct VersionContent {
    /// Ledger record the content was read through.
    pub record: VersionRecord,
    /// Plaintext bytes.
    pub content: Vec<u8>,
}

impl std::fmt::Debug for VersionContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionContent")
            .field("record", &self.record)
            .field("size", &self.content.len())
            .finish()
    }
}

/// Outcome of [`VersioningEngine::compare_versions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionComparison {
    /// Compared resource.
    pub resource_id: ResourceId,
    /// Fingerprint of the first version.
    pub v1_hash: ContentHash,
    /// Fingerprint of the second version.
    pub v2_hash: ContentHash,
    /// Whether the plaintexts differ.
    pub is_different: bool,
    /// Metadata of the first version.
    pub v1: VersionMetadata,
    /// Metadata of the second version.
    pub v2: VersionMetadata,
}

/// A version whose blob could not be removed during a prune.
///
/// The record is still removed; the blob becomes an orphan and is collected
/// by the next sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
    /// Version that was pruned from the ledger.
    pub version: VersionNumber,
    /// Blob that survived.
    pub storage_key: StorageKey,
    /// Store error message.
    pub reason: String,
}

/// Outcome of [`VersioningEngine::prune_versions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Number of newest versions kept.
    pub retained: usize,
    /// Versions whose blob and record were both removed.
    pub deleted: Vec<VersionNumber>,
    /// Versions whose record was removed but whose blob delete failed.
    pub failed: Vec<PruneFailure>,
}

/// Outcome of [`VersioningEngine::sweep_orphans`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Blobs present in the store when the sweep started.
    pub scanned: usize,
    /// Orphaned blobs removed.
    pub removed: Vec<StorageKey>,
    /// Orphaned blobs that could not be removed.
    pub failed: Vec<StorageKey>,
    /// Blobs whose key does not follow the `<resource>/<name>` layout.
    pub skipped: usize,
}

/// Encrypted, append-only document versioning over a blob store and a ledger.
pub struct VersioningEngine<S, L> {
    store: S,
    ledger: L,
    cipher: CipherService,
    locks: ResourceLocks,
}

impl<S, L> VersioningEngine<S, L>
where
    S: BlobStore,
    L: Ledger,
{
    /// Assemble an engine from its collaborators.
    pub fn new(store: S, ledger: L, cipher: CipherService) -> Self {
        Self {
            store,
            ledger,
            cipher,
            locks: ResourceLocks::new(),
        }
    }

    /// The blob store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The version ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The cipher used for new versions.
    pub fn cipher(&self) -> &CipherService {
        &self.cipher
    }

    /// Encrypt and store `file` as the next version of `resource`.
    ///
    /// The version number comes from the ledger; whatever `resource.version`
    /// held on entry is only a hint. On success the resource's pointer fields
    /// are advanced to the new version. The actor is taken from
    /// `resource.last_modified_by`.
    ///
    /// # Errors
    ///
    /// - `Encryption` if the content cannot be encrypted (nothing written)
    /// - `StorageWrite` if the blob cannot be stored (no record written)
    /// - `LedgerWrite` if the record cannot be written (the blob is left for
    ///   the orphan sweep)
    ///
    /// The number is reserved before the blob is written, so a `StorageWrite`
    /// or `LedgerWrite` failure burns it: numbers stay unique and increasing
    /// but may skip.
    pub async fn create_version(
        &self,
        resource: &mut Resource,
        file: &UploadedFile,
        change_type: ChangeType,
    ) -> VersionResult<VersionRecord> {
        let _guard = self.locks.acquire(&resource.id).await;
        let modified_by = resource.last_modified_by.clone();
        self.append_locked(resource, file, change_type, modified_by)
            .await
    }

    /// Fetch, decrypt and verify one version.
    ///
    /// # Errors
    ///
    /// - `VersionNotFound` if the ledger has no such version
    /// - `StorageRead` if the blob is missing or unreadable
    /// - `Integrity` if authentication or the fingerprint check fails
    pub async fn get_version(
        &self,
        resource_id: &ResourceId,
        version: VersionNumber,
    ) -> VersionResult<VersionContent> {
        let record = self
            .ledger
            .find_version(resource_id, version)
            .await
            .map_err(VersionError::LedgerRead)?
            .ok_or_else(|| {
                tracing::debug!(resource_id = %resource_id, version = version.value(), "version not found");
                VersionError::VersionNotFound {
                    resource_id: resource_id.to_string(),
                    version: version.value(),
                }
            })?;

        self.read_record(record).await
    }

    /// All surviving versions of a resource, newest first.
    ///
    /// An unknown resource yields an empty list.
    pub async fn list_versions(&self, resource_id: &ResourceId) -> VersionResult<Vec<VersionRecord>> {
        self.ledger
            .find_by_resource(resource_id)
            .await
            .map_err(VersionError::LedgerRead)
    }

    /// The newest surviving version, if any.
    pub async fn current_version(
        &self,
        resource_id: &ResourceId,
    ) -> VersionResult<Option<VersionRecord>> {
        Ok(self.list_versions(resource_id).await?.into_iter().next())
    }

    /// Fetch both versions concurrently and compare their fingerprints.
    ///
    /// Both versions are fully verified; comparing a version with itself is
    /// allowed and reports no difference.
    pub async fn compare_versions(
        &self,
        resource_id: &ResourceId,
        v1: VersionNumber,
        v2: VersionNumber,
    ) -> VersionResult<VersionComparison> {
        let (first, second) = tokio::try_join!(
            self.get_version(resource_id, v1),
            self.get_version(resource_id, v2)
        )?;

        Ok(VersionComparison {
            resource_id: resource_id.clone(),
            v1_hash: first.record.file_hash,
            v2_hash: second.record.file_hash,
            is_different: first.record.file_hash != second.record.file_hash,
            v1: first.record.metadata,
            v2: second.record.metadata,
        })
    }

    /// Append a new version whose content equals `target`.
    ///
    /// History is never rewritten: the result is a fresh `update` version
    /// with the target's plaintext and MIME type, encrypted under new key
    /// material. The actor is `resource.last_modified_by`, falling back to
    /// whoever wrote the target.
    pub async fn revert_to_version(
        &self,
        resource: &mut Resource,
        target: VersionNumber,
    ) -> VersionResult<VersionRecord> {
        let _guard = self.locks.acquire(&resource.id).await;

        let old = self.get_version(&resource.id, target).await?;
        let file = UploadedFile::new(old.content, old.record.metadata.mime_type.clone());
        let modified_by = resource
            .last_modified_by
            .clone()
            .or_else(|| old.record.metadata.modified_by.clone());

        let record = self
            .append_locked(resource, &file, ChangeType::Update, modified_by)
            .await?;

        tracing::info!(
            target: "docvault::audit",
            resource_id = %record.resource_id,
            from_version = target.value(),
            version = record.version.value(),
            "resource reverted"
        );
        Ok(record)
    }

    /// Keep the `retain_count` newest versions and remove the rest.
    ///
    /// Each older version's blob is deleted first; its record is removed
    /// afterwards whether or not the blob delete succeeded. Blob failures are
    /// reported, not raised. A `retain_count` of zero clears the history;
    /// the version counter is kept, so later creates continue the sequence.
    ///
    /// # Errors
    ///
    /// - `LedgerRead` / `LedgerWrite` if the ledger cannot be queried or updated
    pub async fn prune_versions(
        &self,
        resource_id: &ResourceId,
        retain_count: usize,
    ) -> VersionResult<PruneReport> {
        let _guard = self.locks.acquire(resource_id).await;

        let mut records = self
            .ledger
            .find_by_resource(resource_id)
            .await
            .map_err(VersionError::LedgerRead)?;
        if records.len() <= retain_count {
            tracing::debug!(resource_id = %resource_id, count = records.len(), "nothing to prune");
            return Ok(PruneReport {
                retained: records.len(),
                ..PruneReport::default()
            });
        }

        let doomed = records.split_off(retain_count);
        let mut report = PruneReport {
            retained: records.len(),
            ..PruneReport::default()
        };

        for record in &doomed {
            match self.store.delete(&record.storage_key).await {
                Ok(()) => report.deleted.push(record.version),
                Err(ContentError::NotFound { .. }) => {
                    tracing::warn!(
                        resource_id = %resource_id,
                        version = record.version.value(),
                        key = %record.storage_key,
                        "blob already missing during prune"
                    );
                    report.deleted.push(record.version);
                }
                Err(e) => {
                    tracing::warn!(
                        resource_id = %resource_id,
                        version = record.version.value(),
                        key = %record.storage_key,
                        error = %e,
                        "failed to delete blob during prune"
                    );
                    report.failed.push(PruneFailure {
                        version: record.version,
                        storage_key: record.storage_key.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let filter = VersionFilter::Versions {
            resource_id: resource_id.clone(),
            versions: doomed.iter().map(|r| r.version).collect(),
        };
        let removed = self
            .ledger
            .delete_many(&filter)
            .await
            .map_err(|source| VersionError::LedgerWrite {
                resource_id: resource_id.to_string(),
                source,
            })?;

        tracing::info!(
            target: "docvault::audit",
            resource_id = %resource_id,
            retained = report.retained,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            records_removed = removed,
            "versions pruned"
        );
        Ok(report)
    }

    /// Delete blobs no ledger record references.
    ///
    /// Each candidate is re-checked under its resource's lock, so a blob
    /// written by an in-flight create is never taken for an orphan.
    pub async fn sweep_orphans(&self) -> VersionResult<SweepReport> {
        let keys = self
            .store
            .list_keys()
            .await
            .map_err(|source| VersionError::StorageRead {
                key: "*".into(),
                source,
            })?;
        let referenced = self
            .ledger
            .storage_keys()
            .await
            .map_err(VersionError::LedgerRead)?;

        let mut report = SweepReport {
            scanned: keys.len(),
            ..SweepReport::default()
        };

        for key in keys.into_iter().filter(|k| !referenced.contains(k)) {
            let Some(resource_id) = key.resource_id() else {
                tracing::warn!(key = %key, "skipping blob with unrecognized key");
                report.skipped += 1;
                continue;
            };

            let _guard = self.locks.acquire(&resource_id).await;
            let still_orphaned = self
                .ledger
                .find_by_resource(&resource_id)
                .await
                .map_err(VersionError::LedgerRead)?
                .iter()
                .all(|r| r.storage_key != key);
            if !still_orphaned {
                continue;
            }

            match self.store.delete(&key).await {
                Ok(()) | Err(ContentError::NotFound { .. }) => report.removed.push(key),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to delete orphaned blob");
                    report.failed.push(key);
                }
            }
        }

        if !report.removed.is_empty() || !report.failed.is_empty() {
            tracing::info!(
                target: "docvault::audit",
                scanned = report.scanned,
                removed = report.removed.len(),
                failed = report.failed.len(),
                "orphan sweep finished"
            );
        }
        Ok(report)
    }

    /// Write one version. Caller holds the resource lock.
    async fn append_locked(
        &self,
        resource: &mut Resource,
        file: &UploadedFile,
        change_type: ChangeType,
        modified_by: Option<String>,
    ) -> VersionResult<VersionRecord> {
        let file_hash = fingerprint(&file.bytes);
        let encrypted = self
            .cipher
            .encrypt(&file.bytes)
            .map_err(VersionError::Encryption)?;

        let version = self
            .ledger
            .next_version(&resource.id)
            .await
            .map_err(|source| VersionError::LedgerWrite {
                resource_id: resource.id.to_string(),
                source,
            })?;
        let storage_key = StorageKey::derive(&resource.id, &file_hash, version);

        if let Err(source) = self.store.put(&storage_key, &encrypted.ciphertext).await {
            tracing::error!(
                resource_id = %resource.id,
                version = version.value(),
                key = %storage_key,
                error = %source,
                "failed to store blob"
            );
            return Err(VersionError::StorageWrite {
                key: storage_key.to_string(),
                source,
            });
        }

        let now = current_timestamp();
        let record = VersionRecord {
            resource_id: resource.id.clone(),
            version,
            storage_key,
            file_hash,
            encryption: encrypted.metadata,
            change_type,
            metadata: VersionMetadata {
                last_modified: now,
                size: file.size(),
                mime_type: file.mime_type.clone(),
                modified_by,
            },
            created_at: now,
        };

        let record = match self.ledger.insert(record).await {
            Ok(record) => record,
            Err(source) => {
                tracing::error!(
                    resource_id = %resource.id,
                    version = version.value(),
                    error = %source,
                    "failed to record version; blob left for sweep"
                );
                return Err(VersionError::LedgerWrite {
                    resource_id: resource.id.to_string(),
                    source,
                });
            }
        };

        resource.version = record.version;
        resource.storage_key = Some(record.storage_key.clone());
        resource.file_hash = Some(record.file_hash);

        tracing::info!(
            target: "docvault::audit",
            resource_id = %record.resource_id,
            version = record.version.value(),
            change_type = %record.change_type,
            size = record.metadata.size,
            modified_by = record.metadata.modified_by.as_deref().unwrap_or("-"),
            "version created"
        );
        Ok(record)
    }

    async fn read_record(&self, record: VersionRecord) -> VersionResult<VersionContent> {
        let ciphertext = match self.store.get(&record.storage_key).await {
            Ok(bytes) => bytes,
            Err(source) => {
                tracing::error!(
                    resource_id = %record.resource_id,
                    version = record.version.value(),
                    key = %record.storage_key,
                    error = %source,
                    "ledger references an unreadable blob"
                );
                return Err(VersionError::StorageRead {
                    key: record.storage_key.to_string(),
                    source,
                });
            }
        };

        match self
            .cipher
            .open(&ciphertext, &record.encryption, &record.file_hash)
        {
            Ok(content) => Ok(VersionContent { record, content }),
            Err(source) => {
                tracing::warn!(
                    target: "docvault::security",
                    resource_id = %record.resource_id,
                    version = record.version.value(),
                    error = %source,
                    "integrity check failed"
                );
                Err(VersionError::Integrity {
                    resource_id: record.resource_id.to_string(),
                    version: record.version.value(),
                    source,
                })
            }
        }
    }
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vault_content::{InlineKeyProvider, MemoryStore};
    use vault_ledger::MemoryLedger;
    use vault_types::CipherAlgorithm;

    fn engine() -> VersioningEngine<MemoryStore, MemoryLedger> {
        VersioningEngine::new(
            MemoryStore::new(),
            MemoryLedger::new(),
            CipherService::new(CipherAlgorithm::Aes256Gcm, Arc::new(InlineKeyProvider)),
        )
    }

    fn rid(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    #[tokio::test]
    async fn create_advances_resource_pointer() {
        let engine = engine();
        let mut resource = Resource::new(rid("doc")).with_modifier("alice");

        let record = engine
            .create_version(
                &mut resource,
                &UploadedFile::new(b"first".to_vec(), "text/plain"),
                ChangeType::Create,
            )
            .await
            .unwrap();

        assert_eq!(record.version, VersionNumber::first());
        assert_eq!(resource.version, record.version);
        assert_eq!(resource.storage_key.as_ref(), Some(&record.storage_key));
        assert_eq!(resource.file_hash, Some(fingerprint(b"first")));
        assert_eq!(record.metadata.modified_by.as_deref(), Some("alice"));
        assert_eq!(record.metadata.size, 5);
        assert!(engine.store().contains(&record.storage_key).await.unwrap());
    }

    #[tokio::test]
    async fn blob_holds_ciphertext_only() {
        let engine = engine();
        let mut resource = Resource::new(rid("doc"));
        let record = engine
            .create_version(
                &mut resource,
                &UploadedFile::new(b"secret plaintext".to_vec(), "text/plain"),
                ChangeType::Create,
            )
            .await
            .unwrap();

        let blob = engine.store().get(&record.storage_key).await.unwrap();
        assert_eq!(blob.len(), b"secret plaintext".len());
        assert_ne!(blob, b"secret plaintext");
    }

    #[tokio::test]
    async fn current_version_is_newest() {
        let engine = engine();
        let mut resource = Resource::new(rid("doc"));
        assert!(engine.current_version(&resource.id).await.unwrap().is_none());

        for body in ["a", "b", "c"] {
            engine
                .create_version(
                    &mut resource,
                    &UploadedFile::new(body.as_bytes().to_vec(), "text/plain"),
                    ChangeType::Update,
                )
                .await
                .unwrap();
        }

        let current = engine.current_version(&resource.id).await.unwrap().unwrap();
        assert_eq!(current.version.value(), 3);
    }

    #[tokio::test]
    async fn revert_falls_back_to_original_author() {
        let engine = engine();
        let mut resource = Resource::new(rid("doc")).with_modifier("alice");
        engine
            .create_version(
                &mut resource,
                &UploadedFile::new(b"v1".to_vec(), "text/markdown"),
                ChangeType::Create,
            )
            .await
            .unwrap();

        let mut anonymous = Resource::new(rid("doc"));
        let record = engine
            .revert_to_version(&mut anonymous, VersionNumber::first())
            .await
            .unwrap();

        assert_eq!(record.version.value(), 2);
        assert_eq!(record.change_type, ChangeType::Update);
        assert_eq!(record.metadata.mime_type, "text/markdown");
        assert_eq!(record.metadata.modified_by.as_deref(), Some("alice"));
        assert_eq!(anonymous.version.value(), 2);
    }

    #[tokio::test]
    async fn prune_zero_on_empty_history_is_noop() {
        let engine = engine();
        let report = engine.prune_versions(&rid("doc"), 0).await.unwrap();
        assert_eq!(report, PruneReport::default());
    }

    #[tokio::test]
    async fn prune_with_nothing_to_do() {
        let engine = engine();
        let report = engine.prune_versions(&rid("ghost"), 3).await.unwrap();
        assert_eq!(report, PruneReport::default());
    }
}
