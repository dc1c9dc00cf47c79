use crate::commands::common::{format_status_lines, StatusReport};
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_status(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let report = StatusReport {
        device_id: ctx.client.device_id().to_string(),
        backend: ctx.client.backend().describe(),
        status: ctx.client.check_connection().await,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}
