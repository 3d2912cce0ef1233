//! Drop versions beyond a retention count.

use anyhow::Result;
use vault_engine::PruneReport;
use vault_types::ResourceId;

use crate::context::Vault;

/// Run the prune command.
pub async fn run(
    vault: &Vault,
    resource: &ResourceId,
    retain: usize,
    json: bool,
) -> Result<PruneReport> {
    let report = vault.prune_versions(resource, retain).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    if report.deleted.is_empty() && report.failed.is_empty() {
        println!("Nothing to prune ({} versions kept)", report.retained);
        return Ok(report);
    }

    println!(
        "Pruned {}: kept {}, deleted {}",
        resource,
        report.retained,
        report.deleted.len()
    );
    if !report.failed.is_empty() {
        println!(
            "  {} blobs could not be deleted and will be retried by the next sweep:",
            report.failed.len()
        );
        for failure in &report.failed {
            println!("    v{} {}: {}", failure.version, failure.storage_key, failure.reason);
        }
    }
    Ok(report)
}
