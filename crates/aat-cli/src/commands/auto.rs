use std::sync::Arc;
use std::time::Duration;

use aat_core::config::minutes;
use aat_core::SyncStatus;

use crate::context::CliContext;
use crate::error::CliError;

const MAX_INTERVAL_MINUTES: u64 = 1_440;

pub fn resolve_interval(flag: Option<u64>, configured: Duration) -> Result<Duration, CliError> {
    match flag {
        None => Ok(configured),
        Some(value) if (1..=MAX_INTERVAL_MINUTES).contains(&value) => Ok(minutes(value)),
        Some(value) => Err(CliError::Config(format!(
            "--interval-minutes must be in [1, {MAX_INTERVAL_MINUTES}], got {value}"
        ))),
    }
}

pub fn describe_transition(status: &SyncStatus) -> String {
    if status.sync_in_progress {
        "Syncing...".to_string()
    } else if let Some(error) = &status.error {
        error.clone()
    } else if let Some(last_sync) = &status.last_sync {
        format!("Synced at {last_sync}")
    } else {
        "Waiting for first sync".to_string()
    }
}

/// Run the auto-sync timer until Ctrl-C.
pub async fn run_auto(ctx: &CliContext, interval_minutes: Option<u64>) -> Result<(), CliError> {
    let interval = resolve_interval(interval_minutes, ctx.config.auto_sync_interval)?;

    let subscription = ctx.client.subscribe(Arc::new(|status: &SyncStatus| {
        println!("{}", describe_transition(status));
    }));
    ctx.client.initialize();

    let handle = ctx.client.start_auto_sync(interval);
    println!(
        "Auto-sync every {} min against {}. Press Ctrl-C to stop.",
        interval.as_secs() / 60,
        ctx.client.backend().describe()
    );

    tokio::signal::ctrl_c().await?;

    handle.stop();
    ctx.client.unsubscribe(subscription);
    println!("Auto-sync stopped");
    Ok(())
}
