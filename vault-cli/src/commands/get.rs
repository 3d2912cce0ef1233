//! Decrypt a version to stdout or a file.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use vault_types::{ResourceId, VersionNumber};

use crate::context::Vault;

/// Run the get command.
pub async fn run(
    vault: &Vault,
    resource: &ResourceId,
    version: VersionNumber,
    out: Option<&Path>,
) -> Result<()> {
    let found = vault.get_version(resource, version).await?;

    match out {
        Some(path) => {
            tokio::fs::write(path, &found.content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} v{} ({} bytes, {}) to {}",
                resource,
                version,
                found.content.len(),
                found.record.metadata.mime_type,
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&found.content)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
