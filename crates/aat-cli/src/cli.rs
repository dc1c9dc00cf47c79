use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "aat")]
#[command(about = "Sync AAT booking data between devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the device id, last sync time and local snapshot
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the sync endpoint (overrides AAT_SYNC_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// How to reach the cloud document
    #[arg(long, global = true, value_enum, default_value_t = BackendKind::Http)]
    pub backend: BackendKind,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum BackendKind {
    /// Through the sync endpoint over HTTP
    Http,
    /// Straight to the Upstash store, merging locally
    Direct,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push the local snapshot for merging into the cloud document
    Push {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull the cloud document and merge it into the local snapshot
    Pull {
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the cloud document for every device
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Probe the endpoint and show sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show cloud document statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push the local snapshot periodically until interrupted
    Auto {
        /// Minutes between pushes (overrides AAT_AUTO_SYNC_MINUTES)
        #[arg(long, value_name = "N")]
        interval_minutes: Option<u64>,
    },
    /// Print this device's id
    Device,
    /// Inspect or replace the local snapshot
    Local {
        #[command(subcommand)]
        command: LocalCommands,
    },
}

#[derive(Subcommand)]
pub enum LocalCommands {
    /// Show the local snapshot
    Show {
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the local snapshot with a JSON file
    Import {
        /// File holding `{ "bookings": [...], "services": [...], "users": [...] }`
        path: PathBuf,
    },
}
