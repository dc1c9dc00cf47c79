use std::path::Path;

use aat_core::local::LocalSnapshot;

use crate::commands::common::{format_entity_lines, format_record_count, format_snapshot_lines};
use crate::context::CliContext;
use crate::error::CliError;

pub fn run_local_show(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let snapshot = ctx.snapshot()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("Data dir: {}", ctx.data_dir().display());
        for line in format_snapshot_lines(&snapshot)
            .into_iter()
            .chain(format_entity_lines(&snapshot))
        {
            println!("{line}");
        }
    }
    Ok(())
}

/// Read and validate a snapshot file. Unknown top-level keys are preserved.
pub fn read_snapshot_file(path: &Path) -> Result<LocalSnapshot, CliError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| CliError::InvalidSnapshot {
        path: path.display().to_string(),
        message: error.to_string(),
    })
}

pub fn run_local_import(ctx: &CliContext, path: &Path) -> Result<(), CliError> {
    let snapshot = read_snapshot_file(path)?;
    ctx.save_snapshot(&snapshot)?;
    println!(
        "Imported {} into {}",
        format_record_count(&snapshot.record_count()),
        ctx.data_dir().display()
    );
    Ok(())
}
