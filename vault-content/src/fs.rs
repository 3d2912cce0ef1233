//! Filesystem blob store.
//!
//! Keys map to `<root>/<resourceId>/<fileHash>-v<version>`. Writes land in a
//! hidden temp file beside the target and are renamed into place, so a
//! concurrent reader sees either the old blob or the complete new one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use vault_types::StorageKey;

use crate::error::ContentError;
use crate::store::BlobStore;

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open (and create if missing) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ContentError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| ContentError::StoreError(format!("{}: {}", root.display(), e)))?;
        tracing::debug!(root = %root.display(), "opened filesystem blob store");
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &StorageKey) -> Result<PathBuf, ContentError> {
        let resource = key
            .resource_id()
            .ok_or_else(|| ContentError::InvalidKey(key.to_string()))?;
        let (_, name) = key
            .as_str()
            .split_once('/')
            .ok_or_else(|| ContentError::InvalidKey(key.to_string()))?;
        if name.starts_with('.') || name.contains('\\') || name.contains('\0') {
            return Err(ContentError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(resource.as_str()).join(name))
    }
}

fn io_error(key: &StorageKey, err: std::io::Error) -> ContentError {
    if err.kind() == ErrorKind::NotFound {
        ContentError::NotFound {
            key: key.to_string(),
        }
    } else {
        ContentError::StoreError(format!("{}: {}", key, err))
    }
}

fn temp_suffix() -> Result<String, ContentError> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).map_err(|e| ContentError::StoreError(e.to_string()))?;
    Ok(hex::encode(bytes))
}

#[async_trait]
impl BlobStore for FsStore {
    async fn put(&self, key: &StorageKey, bytes: &[u8]) -> Result<(), ContentError> {
        let path = self.path_for(key)?;
        let dir = path
            .parent()
            .ok_or_else(|| ContentError::InvalidKey(key.to_string()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| io_error(key, e))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ContentError::InvalidKey(key.to_string()))?;
        let temp = dir.join(format!(".{}.tmp-{}", file_name, temp_suffix()?));

        let write = async {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            tokio::fs::rename(&temp, &path).await
        };

        if let Err(e) = write.await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %temp.display(), error = %cleanup, "failed to remove temp blob");
                }
            }
            return Err(io_error(key, e));
        }
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>, ContentError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| io_error(key, e))
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ContentError> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_error(key, e))
    }

    async fn contains(&self, key: &StorageKey) -> Result<bool, ContentError> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(key, e))
    }

    async fn list_keys(&self) -> Result<Vec<StorageKey>, ContentError> {
        let list_error =
            |e: std::io::Error| ContentError::StoreError(format!("{}: {}", self.root.display(), e));

        let mut keys = Vec::new();
        let mut resources = tokio::fs::read_dir(&self.root).await.map_err(list_error)?;
        while let Some(resource) = resources.next_entry().await.map_err(list_error)? {
            if !resource.file_type().await.map_err(list_error)?.is_dir() {
                continue;
            }
            let Some(resource_name) = resource.file_name().to_str().map(str::to_owned) else {
                continue;
            };

            let mut blobs = tokio::fs::read_dir(resource.path())
                .await
                .map_err(list_error)?;
            while let Some(blob) = blobs.next_entry().await.map_err(list_error)? {
                let Some(name) = blob.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if name.starts_with('.') || !blob.file_type().await.map_err(list_error)?.is_file() {
                    continue;
                }
                keys.push(StorageKey::from_raw(format!("{}/{}", resource_name, name)));
            }
        }

        keys.sort();
        Ok(keys)
    }
}
