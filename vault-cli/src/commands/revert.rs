//! Restore an earlier version as a new one.

use anyhow::Result;
use vault_types::{ResourceId, VersionNumber, VersionRecord};

use crate::context::{resource_for, Vault};

/// Run the revert command.
pub async fn run(
    vault: &Vault,
    resource: &ResourceId,
    target: VersionNumber,
    by: Option<String>,
    json: bool,
) -> Result<VersionRecord> {
    let mut current = resource_for(vault, resource, by).await?;
    let record = vault.revert_to_version(&mut current, target).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!(
            "Reverted {} to v{} as new version v{}",
            resource, target, record.version
        );
    }
    Ok(record)
}
