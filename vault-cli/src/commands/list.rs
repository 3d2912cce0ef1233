//! List surviving versions of a resource.

use anyhow::Result;
use vault_types::ResourceId;

use crate::context::{format_size, format_timestamp, Vault};

/// Run the list command.
pub async fn run(vault: &Vault, resource: &ResourceId, json: bool) -> Result<usize> {
    let records = vault.list_versions(resource).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(records.len());
    }

    if records.is_empty() {
        println!("No versions of {}", resource);
        return Ok(0);
    }

    println!("=== {} ({} versions) ===", resource, records.len());
    println!(
        "{:<8} {:<9} {:>10}  {:<14} {:<16} {}",
        "VERSION", "CHANGE", "SIZE", "AUTHOR", "CREATED", "SHA256"
    );
    for record in &records {
        let hash = record.file_hash.to_hex();
        println!(
            "{:<8} {:<9} {:>10}  {:<14} {:<16} {}",
            format!("v{}", record.version),
            record.change_type,
            format_size(record.metadata.size),
            record.metadata.modified_by.as_deref().unwrap_or("-"),
            format_timestamp(record.created_at),
            &hash[..12]
        );
    }
    Ok(records.len())
}
