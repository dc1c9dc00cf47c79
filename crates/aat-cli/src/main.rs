//! AAT sync CLI - push, pull and inspect booking data shared between devices.

mod cli;
mod commands;
mod context;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands, LocalCommands};
use crate::commands::auto::run_auto;
use crate::commands::clear::run_clear;
use crate::commands::device::run_device;
use crate::commands::local::{run_local_import, run_local_show};
use crate::commands::pull::run_pull;
use crate::commands::push::run_push;
use crate::commands::stats::run_stats;
use crate::commands::status::run_status;
use crate::context::CliContext;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aat=info".parse().expect("valid directive"))
                .add_directive("aat_core=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let ctx = CliContext::from_env(cli.data_dir, cli.endpoint, cli.backend)?;

    match cli.command {
        Commands::Push { json } => run_push(&ctx, json).await?,
        Commands::Pull { dry_run, json } => run_pull(&ctx, dry_run, json).await?,
        Commands::Clear { yes } => run_clear(&ctx, yes).await?,
        Commands::Status { json } => run_status(&ctx, json).await?,
        Commands::Stats { json } => run_stats(&ctx, json).await?,
        Commands::Auto { interval_minutes } => run_auto(&ctx, interval_minutes).await?,
        Commands::Device => run_device(&ctx),
        Commands::Local { command } => match command {
            LocalCommands::Show { json } => run_local_show(&ctx, json)?,
            LocalCommands::Import { path } => run_local_import(&ctx, &path)?,
        },
    }

    ctx.client.shutdown();
    Ok(())
}
