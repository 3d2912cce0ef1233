//! Generate a master key for the sealed key provider.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use vault_content::ContentKey;

use crate::context::create_private_file;

/// Run the keygen command.
pub async fn run(path: &Path) -> Result<()> {
    let key = ContentKey::generate().context("Failed to generate key")?;
    let encoded = format!("{}\n", hex::encode(key.as_bytes()));

    let mut file = create_private_file(path)
        .await
        .with_context(|| format!("Refusing to write {}", path.display()))?;
    file.write_all(encoded.as_bytes()).await?;
    file.sync_all().await?;

    println!("Wrote master key to {}", path.display());
    println!();
    println!("Add to docvault.toml:");
    println!("  [encryption]");
    println!("  key_provider = \"sealed\"");
    println!("  master_key_file = \"{}\"", path.display());
    println!();
    println!("Keep a copy somewhere safe: versions sealed under it cannot be read without it.");
    Ok(())
}
