//! # docvault
//!
//! Command-line front end for the docvault versioning engine.
//!
//! ## Commands
//!
//! - `put`: Store a file as the next version of a resource
//! - `get`: Decrypt and print (or save) a version
//! - `list`: List surviving versions, newest first
//! - `compare`: Compare the fingerprints of two versions
//! - `revert`: Append a copy of an earlier version
//! - `prune`: Drop versions beyond a retention count
//! - `sweep`: Remove blobs no version references
//! - `keygen`: Write a master key for the sealed key provider
//!
//! ## Example
//!
//! ```bash
//! docvault put syllabus ./syllabus.pdf --mime application/pdf --by author-7
//! docvault list syllabus
//! docvault revert syllabus 1
//! docvault get syllabus 3 --out restored.pdf
//! docvault prune syllabus --retain 2
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vault_types::{ChangeType, ResourceId, VersionNumber};

mod commands;
mod context;

use commands::{compare, get, keygen, list, prune, put, revert, sweep};

/// Encrypted, append-only document versioning.
#[derive(Parser, Debug)]
#[command(name = "docvault")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults apply if it does not exist)
    #[arg(long, short, global = true, default_value = "docvault.toml")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a file as the next version of a resource
    Put {
        /// Resource identifier
        resource: ResourceId,
        /// File to upload
        file: PathBuf,
        /// MIME type recorded with the version
        #[arg(long, default_value = "application/octet-stream")]
        mime: String,
        /// Actor recorded as the author
        #[arg(long)]
        by: Option<String>,
        /// Change type (default: create for a new resource, update otherwise)
        #[arg(long)]
        change_type: Option<ChangeType>,
    },

    /// Decrypt and print (or save) a version
    Get {
        /// Resource identifier
        resource: ResourceId,
        /// Version number
        version: u64,
        /// Write the plaintext here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// List surviving versions, newest first
    List {
        /// Resource identifier
        resource: ResourceId,
    },

    /// Compare the fingerprints of two versions
    Compare {
        /// Resource identifier
        resource: ResourceId,
        /// First version
        v1: u64,
        /// Second version
        v2: u64,
    },

    /// Append a copy of an earlier version
    Revert {
        /// Resource identifier
        resource: ResourceId,
        /// Version to restore
        version: u64,
        /// Actor recorded as the author
        #[arg(long)]
        by: Option<String>,
    },

    /// Drop versions beyond a retention count
    Prune {
        /// Resource identifier
        resource: ResourceId,
        /// Versions to keep (default: retention.retain_count)
        #[arg(long)]
        retain: Option<usize>,
    },

    /// Remove blobs no version references
    Sweep {
        /// Keep running on the configured interval until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Write a new master key for the sealed key provider
    Keygen {
        /// Destination file (must not exist)
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config;
    let json = cli.json;

    match cli.command {
        Commands::Put {
            resource,
            file,
            mime,
            by,
            change_type,
        } => {
            let (_, vault) = context::open_from(&config_path).await?;
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let args = put::PutArgs {
                resource,
                data,
                mime,
                by,
                change_type,
            };
            put::run(&vault, args, json).await?;
        }
        Commands::Get {
            resource,
            version,
            out,
        } => {
            let (_, vault) = context::open_from(&config_path).await?;
            get::run(&vault, &resource, VersionNumber::new(version), out.as_deref()).await?;
        }
        Commands::List { resource } => {
            let (_, vault) = context::open_from(&config_path).await?;
            list::run(&vault, &resource, json).await?;
        }
        Commands::Compare { resource, v1, v2 } => {
            let (_, vault) = context::open_from(&config_path).await?;
            compare::run(
                &vault,
                &resource,
                VersionNumber::new(v1),
                VersionNumber::new(v2),
                json,
            )
            .await?;
        }
        Commands::Revert {
            resource,
            version,
            by,
        } => {
            let (_, vault) = context::open_from(&config_path).await?;
            revert::run(&vault, &resource, VersionNumber::new(version), by, json).await?;
        }
        Commands::Prune { resource, retain } => {
            let (config, vault) = context::open_from(&config_path).await?;
            let retain = retain.unwrap_or(config.retention.retain_count);
            prune::run(&vault, &resource, retain, json).await?;
        }
        Commands::Sweep { watch } => {
            let (config, vault) = context::open_from(&config_path).await?;
            if watch {
                sweep::watch(vault, config.sweep).await?;
            } else {
                sweep::run(&vault, json).await?;
            }
        }
        Commands::Keygen { path } => {
            keygen::run(&path).await?;
        }
    }

    Ok(())
}
