use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_clear(ctx: &CliContext, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ClearNotConfirmed);
    }

    ctx.client.clear().await?;
    println!("Cloud document cleared");
    Ok(())
}
