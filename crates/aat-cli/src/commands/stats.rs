use aat_core::sync::SyncState;

use crate::commands::common::format_stats_lines;
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_stats(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let stats = ctx.client.stats().await;
    if ctx.client.state() == SyncState::Error {
        if let Some(error) = ctx.client.status().error {
            return Err(CliError::PullFailed(error));
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        for line in format_stats_lines(&stats) {
            println!("{line}");
        }
    }
    Ok(())
}
