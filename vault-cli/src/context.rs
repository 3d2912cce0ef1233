//! Opening the vault described by a configuration file.

use anyhow::{Context, Result};
use std::path::Path;
use vault_content::FsStore;
use vault_engine::{Config, VersioningEngine};
use vault_ledger::SqliteLedger;
use vault_types::{Resource, ResourceId};

/// Engine over the on-disk store and ledger.
pub type Vault = VersioningEngine<FsStore, SqliteLedger>;

/// Load configuration, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    Config::from_file(path).context("Failed to load configuration")
}

/// Open the blob store, ledger and cipher a configuration names.
pub async fn open(config: &Config) -> Result<Vault> {
    let store = FsStore::open(&config.storage.blob_root)
        .await
        .context("Failed to open blob store")?;

    if let Some(parent) = config.storage.database.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create ledger directory")?;
        }
    }
    let ledger = SqliteLedger::new(&config.storage.database)
        .await
        .context("Failed to open ledger")?;

    let cipher = config
        .encryption
        .cipher_service()
        .context("Failed to set up encryption")?;

    Ok(VersioningEngine::new(store, ledger, cipher))
}

/// Load configuration from `path` and open its vault.
pub async fn open_from(path: &Path) -> Result<(Config, Vault)> {
    let config = load_config(path)?;
    let vault = open(&config).await?;
    Ok((config, vault))
}

/// Rebuild a resource's pointer fields from its newest version.
///
/// `by` becomes the actor of the next change.
pub async fn resource_for(vault: &Vault, id: &ResourceId, by: Option<String>) -> Result<Resource> {
    let mut resource = match vault.current_version(id).await? {
        Some(record) => Resource::from_record(&record),
        None => Resource::new(id.clone()),
    };
    resource.last_modified_by = by;
    Ok(resource)
}

/// Format a Unix timestamp relative to now.
pub fn format_timestamp(ts: i64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let diff = now.saturating_sub(ts).max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

/// Format a byte count with a binary unit.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Create a new file readable only by its owner (mode 0600 on Unix).
///
/// The mode is applied at creation, so the file is never visible with
/// wider permissions. Fails if `path` already exists.
pub async fn create_private_file(path: &Path) -> std::io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.storage.blob_root = dir.join("blobs");
        config.storage.database = dir.join("db").join("docvault.db");
        config
    }

    pub async fn vault_in(dir: &Path) -> Vault {
        open(&config_in(dir)).await.unwrap()
    }

    pub fn rid(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }
}
