//! Identity and ordering types for docvault.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Maximum length of a resource identifier in bytes.
pub const MAX_RESOURCE_ID_LEN: usize = 128;

/// Identifier of a logical resource whose content is versioned.
///
/// Restricted to ASCII alphanumerics, `-`, `_` and `.` so that it can be used
/// verbatim as the first segment of a blob key and as a directory name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Validate and wrap an identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, TypesError> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some("empty")
        } else if id.len() > MAX_RESOURCE_ID_LEN {
            Some("too long")
        } else if id == "." || id == ".." {
            Some("reserved name")
        } else if !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        {
            Some("contains characters outside [A-Za-z0-9._-]")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(TypesError::InvalidResourceId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    /// Create a fresh random identifier (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl FromStr for ResourceId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

/// Per-resource version number.
///
/// Assigned by the ledger, never by callers. `0` means "no version yet";
/// the first stored version is `1`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct VersionNumber(u64);

impl VersionNumber {
    /// Create a VersionNumber with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The "no version yet" marker.
    pub fn zero() -> Self {
        Self(0)
    }

    /// The first version of any resource.
    pub fn first() -> Self {
        Self(1)
    }

    /// Get the numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Increment by one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// SHA-256 digest of a version's plaintext.
///
/// Serialized as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded digest.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| TypesError::InvalidHash(s.to_string()))?;
        Ok(Self(bytes))
    }

    /// Get the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..12])
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Key of an encrypted blob in the blob store.
///
/// Derived as `<resourceId>/<fileHash>-v<version>`, which stays unique even
/// when two versions carry identical content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Derive the key for one version of a resource.
    pub fn derive(resource_id: &ResourceId, file_hash: &ContentHash, version: VersionNumber) -> Self {
        Self(format!("{}/{}-v{}", resource_id, file_hash, version.value()))
    }

    /// Wrap an existing key string (e.g. one listed from a store).
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource segment of a derived key, if the key is well formed.
    pub fn resource_id(&self) -> Option<ResourceId> {
        let (prefix, rest) = self.0.split_once('/')?;
        if rest.is_empty() || rest.contains('/') {
            return None;
        }
        ResourceId::new(prefix).ok()
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_accepts_object_id_and_uuid() {
        assert!(ResourceId::new("65f1c0ffee0123456789abcd").is_ok());
        let generated = ResourceId::generate();
        assert_eq!(generated.as_str().len(), 36);
        assert!(ResourceId::new(generated.as_str()).is_ok());
    }

    #[test]
    fn resource_id_rejects_path_segments() {
        assert!(ResourceId::new("").is_err());
        assert!(ResourceId::new("..").is_err());
        assert!(ResourceId::new("a/b").is_err());
        assert!(ResourceId::new("a b").is_err());
        assert!(ResourceId::new("x".repeat(MAX_RESOURCE_ID_LEN + 1)).is_err());
    }

    #[test]
    fn resource_id_serde_validates() {
        let ok: ResourceId = serde_json::from_str("\"doc-1\"").unwrap();
        assert_eq!(ok.as_str(), "doc-1");
        assert!(serde_json::from_str::<ResourceId>("\"../etc\"").is_err());
    }

    #[test]
    fn version_number_ordering_and_next() {
        assert!(VersionNumber::new(1) < VersionNumber::new(2));
        assert_eq!(VersionNumber::zero().next(), VersionNumber::first());
        assert_eq!(VersionNumber::new(u64::MAX).next().value(), u64::MAX);
    }

    #[test]
    fn content_hash_hex_roundtrip() {
        let hash = ContentHash::from_bytes([0xAB; 32]);
        let parsed = ContentHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
        assert!(ContentHash::from_hex("abc").is_err());
        assert!(ContentHash::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn content_hash_serializes_as_hex_string() {
        let hash = ContentHash::from_bytes([0x01; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
    }

    #[test]
    fn storage_key_layout() {
        let rid = ResourceId::new("doc-42").unwrap();
        let hash = ContentHash::from_bytes([0u8; 32]);
        let key = StorageKey::derive(&rid, &hash, VersionNumber::new(3));
        assert_eq!(key.as_str(), format!("doc-42/{}-v3", "00".repeat(32)));
        assert_eq!(key.resource_id(), Some(rid));
    }

    #[test]
    fn storage_key_differs_for_identical_content() {
        let rid = ResourceId::new("doc").unwrap();
        let hash = ContentHash::from_bytes([7u8; 32]);
        let a = StorageKey::derive(&rid, &hash, VersionNumber::new(1));
        let b = StorageKey::derive(&rid, &hash, VersionNumber::new(2));
        assert_ne!(a, b);
    }

    #[test]
    fn storage_key_resource_id_rejects_malformed() {
        assert!(StorageKey::from_raw("no-slash").resource_id().is_none());
        assert!(StorageKey::from_raw("a/b/c").resource_id().is_none());
        assert!(StorageKey::from_raw("a/").resource_id().is_none());
    }
}
