//! Background sweep for orphaned blobs.
//!
//! Periodically removes blobs that no ledger record references: leftovers of
//! creates whose ledger write failed and of prunes whose blob delete failed.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use vault_content::BlobStore;
use vault_ledger::Ledger;

use crate::config::SweepConfig;
use crate::engine::VersioningEngine;

/// Spawn a background sweep task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_sweep_task<S, L>(
    engine: Arc<VersioningEngine<S, L>>,
    config: SweepConfig,
) -> tokio::task::JoinHandle<()>
where
    S: BlobStore + 'static,
    L: Ledger + 'static,
{
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Orphan sweep disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!("Orphan sweep started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;

            match engine.sweep_orphans().await {
                Ok(report) => {
                    if report.removed.is_empty() {
                        tracing::debug!("Sweep: no orphaned blobs ({} scanned)", report.scanned);
                    } else {
                        tracing::info!("Sweep: removed {} orphaned blobs", report.removed.len());
                    }
                }
                Err(e) => {
                    tracing::error!("Sweep error: {}", e);
                }
            }
        }
    })
}
