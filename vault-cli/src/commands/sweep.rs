//! Remove blobs no version references.

use anyhow::Result;
use std::sync::Arc;
use vault_engine::config::SweepConfig;
use vault_engine::{spawn_sweep_task, SweepReport};

use crate::context::Vault;

/// Run a single sweep.
pub async fn run(vault: &Vault, json: bool) -> Result<SweepReport> {
    let report = vault.sweep_orphans().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Scanned {} blobs, removed {} orphans",
            report.scanned,
            report.removed.len()
        );
        for key in &report.failed {
            println!("  could not remove {}", key);
        }
        if report.skipped > 0 {
            println!("  skipped {} blobs with unrecognized names", report.skipped);
        }
    }
    Ok(report)
}

/// Sweep on the configured interval until interrupted.
pub async fn watch(vault: Vault, config: SweepConfig) -> Result<()> {
    if !config.enabled {
        anyhow::bail!("Sweep is disabled in configuration ([sweep] enabled = false)");
    }

    let handle = spawn_sweep_task(Arc::new(vault), config);
    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, stopping sweep");
    handle.abort();
    Ok(())
}
