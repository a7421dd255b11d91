//! Strip command implementation

use anyhow::{Context, Result};
use sm_sql::{normalize_batch, split_batches_on, strip_comments};
use std::fs;

use crate::cli::{GlobalArgs, StripArgs};
use crate::commands::common::load_project;

/// Execute the strip command
pub(crate) fn execute(args: &StripArgs, global: &GlobalArgs) -> Result<()> {
    for line in render(args, global)? {
        println!("{line}");
    }
    Ok(())
}

/// Stripped text of the file, or one block per batch with `--split`.
pub(crate) fn render(args: &StripArgs, global: &GlobalArgs) -> Result<Vec<String>> {
    let path = &args.file;
    let sql = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let stripped = strip_comments(&sql)
        .with_context(|| format!("Failed to strip comments from {}", path.display()))?;

    if !args.split {
        return Ok(vec![stripped]);
    }

    let project = load_project(global)?;
    let batches = split_batches_on(&stripped, &project.config.batch_delimiter);
    if batches.is_empty() {
        log::info!("{} contains no batches", path.display());
    }
    Ok(batches
        .iter()
        .enumerate()
        .map(|(i, batch)| format!("-- batch {}\n{}", i + 1, normalize_batch(batch)))
        .collect())
}
