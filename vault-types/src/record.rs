//! Version records and the metadata they carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;
use crate::ids::{ContentHash, ResourceId, StorageKey, VersionNumber};

/// Why a version was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// First upload of a resource.
    Create,
    /// New content (including reverts).
    Update,
    /// Metadata-only change that still produced a new version.
    Metadata,
}

impl ChangeType {
    /// Lowercase wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Metadata => "metadata",
        }
    }
}

impl FromStr for ChangeType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeType::Create),
            "update" => Ok(ChangeType::Update),
            "metadata" => Ok(ChangeType::Metadata),
            other => Err(TypesError::UnknownChangeType(other.to_string())),
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AEAD algorithm used to encrypt a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CipherAlgorithm {
    /// AES-256-GCM, 96-bit nonce.
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    /// XChaCha20-Poly1305, 192-bit nonce.
    #[serde(rename = "xchacha20-poly1305")]
    XChaCha20Poly1305,
}

impl CipherAlgorithm {
    /// Algorithm identifier as stored in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherAlgorithm::Aes256Gcm => "aes-256-gcm",
            CipherAlgorithm::XChaCha20Poly1305 => "xchacha20-poly1305",
        }
    }

    /// Nonce length in bytes.
    pub fn nonce_len(&self) -> usize {
        match self {
            CipherAlgorithm::Aes256Gcm => 12,
            CipherAlgorithm::XChaCha20Poly1305 => 24,
        }
    }
}

impl FromStr for CipherAlgorithm {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes-256-gcm" => Ok(CipherAlgorithm::Aes256Gcm),
            "xchacha20-poly1305" => Ok(CipherAlgorithm::XChaCha20Poly1305),
            other => Err(TypesError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Material needed to decrypt exactly one version's blob.
///
/// `key` is an opaque token produced by a key provider; depending on the
/// provider it is either the raw key in hex or a sealed (wrapped) key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    /// AEAD algorithm.
    pub algorithm: CipherAlgorithm,
    /// Identifier of the key provider that produced `key`.
    pub key_provider: String,
    /// Key token (hex).
    pub key: String,
    /// Nonce (hex).
    pub nonce: String,
    /// Authentication tag (hex).
    pub tag: String,
    /// Unix timestamp (seconds) of encryption.
    pub encrypted_at: i64,
}

impl fmt::Debug for EncryptionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionMetadata")
            .field("algorithm", &self.algorithm)
            .field("key_provider", &self.key_provider)
            .field("key", &"<redacted>")
            .field("nonce", &self.nonce)
            .field("tag", &self.tag)
            .field("encrypted_at", &self.encrypted_at)
            .finish()
    }
}

/// Descriptive metadata of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Unix timestamp (seconds) of the modification.
    pub last_modified: i64,
    /// Plaintext size in bytes.
    pub size: u64,
    /// MIME type of the content.
    pub mime_type: String,
    /// Actor that produced this version, if known.
    pub modified_by: Option<String>,
}

/// Ledger entry describing one historical state of a resource.
///
/// Written once by the engine and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Owning resource.
    pub resource_id: ResourceId,
    /// Version number, unique per resource.
    pub version: VersionNumber,
    /// Blob key holding this version's ciphertext.
    pub storage_key: StorageKey,
    /// Digest of the plaintext.
    pub file_hash: ContentHash,
    /// Decryption material.
    pub encryption: EncryptionMetadata,
    /// Why this version exists.
    pub change_type: ChangeType,
    /// Descriptive metadata.
    pub metadata: VersionMetadata,
    /// Unix timestamp (seconds) when the record was written.
    pub created_at: i64,
}

/// Pointer fields of an externally owned resource.
///
/// The engine reads `id` and advances the rest after every successful write.
/// Persisting the resource is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier.
    pub id: ResourceId,
    /// Current version (`0` before the first upload).
    pub version: VersionNumber,
    /// Blob key of the current version.
    pub storage_key: Option<StorageKey>,
    /// Plaintext digest of the current version.
    pub file_hash: Option<ContentHash>,
    /// Actor responsible for the next change.
    pub last_modified_by: Option<String>,
}

impl Resource {
    /// A resource with no versions yet.
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            version: VersionNumber::zero(),
            storage_key: None,
            file_hash: None,
            last_modified_by: None,
        }
    }

    /// Set the actor recorded on the next version.
    pub fn with_modifier(mut self, actor: impl Into<String>) -> Self {
        self.last_modified_by = Some(actor.into());
        self
    }

    /// Rebuild the pointer fields from the newest surviving record.
    pub fn from_record(record: &VersionRecord) -> Self {
        Self {
            id: record.resource_id.clone(),
            version: record.version,
            storage_key: Some(record.storage_key.clone()),
            file_hash: Some(record.file_hash),
            last_modified_by: record.metadata.modified_by.clone(),
        }
    }
}

/// A raw upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Plaintext bytes.
    pub bytes: Vec<u8>,
    /// MIME type.
    pub mime_type: String,
}

impl UploadedFile {
    /// Wrap bytes with their MIME type.
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("size", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> EncryptionMetadata {
        EncryptionMetadata {
            algorithm: CipherAlgorithm::Aes256Gcm,
            key_provider: "inline".into(),
            key: "ab".repeat(32),
            nonce: "00".repeat(12),
            tag: "11".repeat(16),
            encrypted_at: 1_700_000_000,
        }
    }

    #[test]
    fn change_type_parse_and_display() {
        for ct in [ChangeType::Create, ChangeType::Update, ChangeType::Metadata] {
            assert_eq!(ct.as_str().parse::<ChangeType>().unwrap(), ct);
        }
        assert!("rename".parse::<ChangeType>().is_err());
        assert_eq!(serde_json::to_string(&ChangeType::Update).unwrap(), "\"update\"");
    }

    #[test]
    fn algorithm_identifiers() {
        assert_eq!(CipherAlgorithm::default(), CipherAlgorithm::Aes256Gcm);
        assert_eq!(
            "xchacha20-poly1305".parse::<CipherAlgorithm>().unwrap(),
            CipherAlgorithm::XChaCha20Poly1305
        );
        assert_eq!(
            serde_json::to_string(&CipherAlgorithm::Aes256Gcm).unwrap(),
            "\"aes-256-gcm\""
        );
        assert!("aes-128-cbc".parse::<CipherAlgorithm>().is_err());
    }

    #[test]
    fn encryption_metadata_debug_redacts_key() {
        let meta = sample_metadata();
        let debug = format!("{:?}", meta);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&meta.key));
    }

    #[test]
    fn resource_from_record_copies_pointers() {
        let rid = ResourceId::new("doc").unwrap();
        let hash = ContentHash::from_bytes([3u8; 32]);
        let record = VersionRecord {
            resource_id: rid.clone(),
            version: VersionNumber::new(4),
            storage_key: StorageKey::derive(&rid, &hash, VersionNumber::new(4)),
            file_hash: hash,
            encryption: sample_metadata(),
            change_type: ChangeType::Update,
            metadata: VersionMetadata {
                last_modified: 1,
                size: 10,
                mime_type: "application/pdf".into(),
                modified_by: Some("editor-7".into()),
            },
            created_at: 1,
        };

        let resource = Resource::from_record(&record);
        assert_eq!(resource.version.value(), 4);
        assert_eq!(resource.file_hash, Some(hash));
        assert_eq!(resource.last_modified_by.as_deref(), Some("editor-7"));
    }

    #[test]
    fn new_resource_has_no_version() {
        let resource = Resource::new(ResourceId::new("doc").unwrap()).with_modifier("alice");
        assert_eq!(resource.version, VersionNumber::zero());
        assert!(resource.storage_key.is_none());
        assert_eq!(resource.last_modified_by.as_deref(), Some("alice"));
    }
}
