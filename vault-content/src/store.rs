//! Key-addressed blob storage.
//!
//! This module provides a trait for storing encrypted version blobs under
//! derived storage keys, plus a memory-based implementation for testing.
//! Stores offer create/read/delete by key only: no transactions, no rename.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use vault_types::StorageKey;

use crate::error::ContentError;

/// Trait for key-addressed blob storage.
///
/// All implementations store ciphertext only. A successful `put` must be
/// visible to the same caller's next `get` (read-your-writes).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, replacing any previous value.
    async fn put(&self, key: &StorageKey, bytes: &[u8]) -> Result<(), ContentError>;

    /// Retrieve the bytes stored under `key`.
    ///
    /// Returns `NotFound` if the key is not in the store.
    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>, ContentError>;

    /// Delete the bytes stored under `key`.
    ///
    /// Returns `NotFound` if the key is not in the store.
    async fn delete(&self, key: &StorageKey) -> Result<(), ContentError>;

    /// Check if a key exists in the store.
    async fn contains(&self, key: &StorageKey) -> Result<bool, ContentError>;

    /// List every key currently in the store.
    async fn list_keys(&self) -> Result<Vec<StorageKey>, ContentError>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn put(&self, key: &StorageKey, bytes: &[u8]) -> Result<(), ContentError> {
        (**self).put(key, bytes).await
    }

    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>, ContentError> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ContentError> {
        (**self).delete(key).await
    }

    async fn contains(&self, key: &StorageKey) -> Result<bool, ContentError> {
        (**self).contains(key).await
    }

    async fn list_keys(&self) -> Result<Vec<StorageKey>, ContentError> {
        (**self).list_keys().await
    }
}

/// In-memory blob store for testing.
///
/// Stores blobs in a thread-safe HashMap. Clones share the same map. Not
/// persistent - all data is lost when the last clone is dropped.
#[derive(Default, Clone)]
pub struct MemoryStore {
    blobs: Arc<Mutex<HashMap<StorageKey, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs().is_empty()
    }

    /// Clear all blobs from the store.
    pub fn clear(&self) {
        self.blobs().clear();
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<StorageKey, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, key: &StorageKey, bytes: &[u8]) -> Result<(), ContentError> {
        self.blobs().insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>, ContentError> {
        self.blobs()
            .get(key)
            .cloned()
            .ok_or_else(|| ContentError::NotFound {
                key: key.to_string(),
            })
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ContentError> {
        self.blobs()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ContentError::NotFound {
                key: key.to_string(),
            })
    }

    async fn contains(&self, key: &StorageKey) -> Result<bool, ContentError> {
        Ok(self.blobs().contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<StorageKey>, ContentError> {
        let mut keys: Vec<StorageKey> = self.blobs().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
