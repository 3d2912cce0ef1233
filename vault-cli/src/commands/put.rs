//! Store a file as the next version of a resource.

use anyhow::Result;
use vault_types::{ChangeType, ResourceId, UploadedFile, VersionRecord};

use crate::context::{format_size, resource_for, Vault};

/// Arguments for the put command.
pub struct PutArgs {
    /// Target resource.
    pub resource: ResourceId,
    /// File contents.
    pub data: Vec<u8>,
    /// MIME type.
    pub mime: String,
    /// Actor recorded with the version.
    pub by: Option<String>,
    /// Explicit change type.
    pub change_type: Option<ChangeType>,
}

/// Run the put command.
pub async fn run(vault: &Vault, args: PutArgs, json: bool) -> Result<VersionRecord> {
    let mut resource = resource_for(vault, &args.resource, args.by).await?;
    let change_type = args.change_type.unwrap_or(if resource.version.value() == 0 {
        ChangeType::Create
    } else {
        ChangeType::Update
    });

    let file = UploadedFile::new(args.data, args.mime);
    let record = vault
        .create_version(&mut resource, &file, change_type)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!(
            "Stored {} v{} ({}, {})",
            record.resource_id,
            record.version,
            format_size(record.metadata.size),
            record.change_type
        );
        println!("  sha256: {}", record.file_hash);
    }
    Ok(record)
}
