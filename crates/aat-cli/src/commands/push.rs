use aat_core::PushAck;

use crate::commands::common::format_push_lines;
use crate::context::CliContext;
use crate::error::CliError;

pub async fn push_snapshot(ctx: &CliContext) -> Result<PushAck, CliError> {
    let snapshot = ctx.snapshot()?;
    ctx.client.push(&snapshot).await?.ok_or(CliError::SyncBusy)
}

pub async fn run_push(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let ack = push_snapshot(ctx).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&ack)?);
    } else {
        for line in format_push_lines(&ack) {
            println!("{line}");
        }
    }
    Ok(())
}
