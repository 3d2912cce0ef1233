//! Configuration loading for docvault.
//!
//! Configuration is loaded from a TOML file (default: `docvault.toml`).
//! Every section is optional; missing values fall back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vault_content::{CipherService, InlineKeyProvider, KeyProvider, SealedKeyProvider};
use vault_types::CipherAlgorithm;

/// Root configuration for docvault.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Blob and ledger locations.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Cipher and key handling.
    #[serde(default)]
    pub encryption: EncryptionConfig,
    /// Version retention.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Orphan sweep task.
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the filesystem blob store (default: `blobs`).
    #[serde(default = "default_blob_root")]
    pub blob_root: PathBuf,
    /// Path to SQLite ledger database (default: `docvault.db`).
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

/// How content keys are kept in version metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyProviderKind {
    /// Key stored hex-encoded next to the record.
    #[default]
    Inline,
    /// Key wrapped under a master key read from `master_key_file`.
    Sealed,
}

/// Encryption configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptionConfig {
    /// AEAD used for new versions (default: `aes-256-gcm`).
    #[serde(default)]
    pub algorithm: CipherAlgorithm,
    /// Key provider (default: `inline`).
    #[serde(default)]
    pub key_provider: KeyProviderKind,
    /// Hex-encoded 32-byte master key, required for `sealed`.
    pub master_key_file: Option<PathBuf>,
}

/// Retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Versions kept by a prune without an explicit count (default: 5).
    #[serde(default = "default_retain_count")]
    pub retain_count: usize,
}

/// Orphan sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Sweep interval in seconds (default: 3600 = 1 hour).
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
    /// Enable the background sweep (default: true).
    #[serde(default = "default_sweep_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_blob_root() -> PathBuf {
    PathBuf::from("blobs")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("docvault.db")
}

fn default_retain_count() -> usize {
    5
}

fn default_sweep_interval() -> u64 {
    3600 // 1 hour
}

fn default_sweep_enabled() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_root: default_blob_root(),
            database: default_database_path(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retain_count: default_retain_count(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
            enabled: default_sweep_enabled(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or holds values
    /// the engine cannot run with.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep.interval_secs must be at least 1".into(),
            ));
        }
        if self.encryption.key_provider == KeyProviderKind::Sealed
            && self.encryption.master_key_file.is_none()
        {
            return Err(ConfigError::Invalid(
                "encryption.master_key_file is required for the sealed key provider".into(),
            ));
        }
        Ok(())
    }
}

impl EncryptionConfig {
    /// Build the cipher service this section describes.
    ///
    /// Reads the master key file for the sealed provider.
    pub fn cipher_service(&self) -> Result<CipherService, ConfigError> {
        let keys: Arc<dyn KeyProvider> = match self.key_provider {
            KeyProviderKind::Inline => Arc::new(InlineKeyProvider),
            KeyProviderKind::Sealed => {
                let path = self.master_key_file.as_ref().ok_or_else(|| {
                    ConfigError::Invalid(
                        "encryption.master_key_file is required for the sealed key provider"
                            .into(),
                    )
                })?;
                let master = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                    path: path.clone(),
                    source: e,
                })?;
                let provider = SealedKeyProvider::from_hex(&master).map_err(|e| {
                    ConfigError::Invalid(format!("master key {}: {}", path.display(), e))
                })?;
                Arc::new(provider)
            }
        };
        Ok(CipherService::new(self.algorithm, keys))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration (or key) file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Values parse but cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.storage.blob_root, PathBuf::from("blobs"));
        assert_eq!(config.storage.database, PathBuf::from("docvault.db"));
        assert_eq!(config.encryption.algorithm, CipherAlgorithm::Aes256Gcm);
        assert_eq!(config.encryption.key_provider, KeyProviderKind::Inline);
        assert_eq!(config.retention.retain_count, 5);
        assert_eq!(config.sweep.interval_secs, 3600);
        assert!(config.sweep.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[storage]
blob_root = "/var/lib/docvault/blobs"
database = "/var/lib/docvault/ledger.db"

[encryption]
algorithm = "xchacha20-poly1305"

[retention]
retain_count = 10

[sweep]
interval_secs = 600
enabled = false
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.storage.blob_root,
            PathBuf::from("/var/lib/docvault/blobs")
        );
        assert_eq!(
            config.encryption.algorithm,
            CipherAlgorithm::XChaCha20Poly1305
        );
        assert_eq!(config.encryption.key_provider, KeyProviderKind::Inline);
        assert_eq!(config.retention.retain_count, 10);
        assert_eq!(config.sweep.interval_secs, 600);
        assert!(!config.sweep.enabled);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.retention.retain_count, 5);
        assert_eq!(config.storage.database, PathBuf::from("docvault.db"));
    }

    #[test]
    fn unknown_algorithm_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docvault.toml");
        std::fs::write(&path, "[encryption]\nalgorithm = \"rot13\"\n").unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn zero_retention_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docvault.toml");
        std::fs::write(&path, "[retention]\nretain_count = 0\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.retention.retain_count, 0);
    }

    #[test]
    fn sealed_without_key_file_is_invalid() {
        let config: Config = toml::from_str("[encryption]\nkey_provider = \"sealed\"\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(config.encryption.cipher_service().is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = Config::from_file(Path::new("/nonexistent/docvault.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn sealed_cipher_from_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("master.key");
        std::fs::write(&key_path, format!("{}\n", "11".repeat(32))).unwrap();

        let encryption = EncryptionConfig {
            algorithm: CipherAlgorithm::Aes256Gcm,
            key_provider: KeyProviderKind::Sealed,
            master_key_file: Some(key_path),
        };
        let cipher = encryption.cipher_service().unwrap();
        assert_eq!(cipher.key_provider(), SealedKeyProvider::ID);
    }

    #[test]
    fn malformed_master_key_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("master.key");
        std::fs::write(&key_path, "not-hex").unwrap();

        let encryption = EncryptionConfig {
            algorithm: CipherAlgorithm::Aes256Gcm,
            key_provider: KeyProviderKind::Sealed,
            master_key_file: Some(key_path),
        };
        assert!(matches!(
            encryption.cipher_service(),
            Err(ConfigError::Invalid(_))
        ));
    }
}
