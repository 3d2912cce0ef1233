//! Compare two versions of a resource.

use anyhow::Result;
use vault_engine::VersionComparison;
use vault_types::{ResourceId, VersionNumber};

use crate::context::{format_size, Vault};

/// Run the compare command.
pub async fn run(
    vault: &Vault,
    resource: &ResourceId,
    v1: VersionNumber,
    v2: VersionNumber,
    json: bool,
) -> Result<VersionComparison> {
    let comparison = vault.compare_versions(resource, v1, v2).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        println!("=== {} v{} vs v{} ===", resource, v1, v2);
        for (label, hash, meta) in [
            (v1, &comparison.v1_hash, &comparison.v1),
            (v2, &comparison.v2_hash, &comparison.v2),
        ] {
            println!(
                "  v{:<6} {}  {:>10}  {}",
                label,
                hash,
                format_size(meta.size),
                meta.mime_type
            );
        }
        if comparison.is_different {
            println!("Content differs");
        } else {
            println!("Content is identical");
        }
    }
    Ok(comparison)
}
