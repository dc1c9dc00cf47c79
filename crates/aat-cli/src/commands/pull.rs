use aat_core::local::PullSummary;

use crate::commands::common::{format_pull_lines, PullReport};
use crate::context::CliContext;
use crate::error::CliError;

/// Fetch the cloud document and merge it into the local snapshot.
///
/// The snapshot is saved only when something changed and `dry_run` is off.
pub async fn pull_into_snapshot(
    ctx: &CliContext,
    dry_run: bool,
) -> Result<(PullReport, PullSummary), CliError> {
    let Some(document) = ctx.client.pull().await else {
        let status = ctx.client.status();
        return Err(status
            .error
            .map_or(CliError::SyncBusy, CliError::PullFailed));
    };

    let mut snapshot = ctx.snapshot()?;
    let summary = snapshot.apply_pulled(&document);
    let saved = !dry_run && summary.changed();
    if saved {
        ctx.save_snapshot(&snapshot)?;
    }

    let report = PullReport {
        version: document.version,
        last_modified: document.last_modified,
        device_id: document.device_id,
        inserted: summary.inserted(),
        updated: summary.updated(),
        saved,
    };
    Ok((report, summary))
}

pub async fn run_pull(ctx: &CliContext, dry_run: bool, as_json: bool) -> Result<(), CliError> {
    let (report, summary) = pull_into_snapshot(ctx, dry_run).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_pull_lines(&report, &summary) {
            println!("{line}");
        }
    }
    Ok(())
}
