//! Status command implementation

use anyhow::Result;
use serde::Serialize;
use sm_db::query_scalar_as;
use sm_migrate::MigrationRunner;

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::{close_database, load_project, resolve_target};

/// Version state of a database, for display.
#[derive(Debug, Serialize)]
pub(crate) struct StatusReport {
    pub(crate) database: String,
    pub(crate) current_version: i64,
    pub(crate) target_version: Option<i64>,
    pub(crate) pending: Vec<i64>,
    /// Version whose in-progress marker was left behind by an interrupted run
    pub(crate) interrupted: Option<i64>,
}

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let report = build_report(args, global)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

pub(crate) fn build_report(args: &StatusArgs, global: &GlobalArgs) -> Result<StatusReport> {
    let project = load_project(global)?;
    let source = project.source();
    let store = project.store();
    let target = resolve_target(&source, args.target)?;

    let mut db = project.open_database(&store)?;
    let interrupted: Option<i64> = query_scalar_as(&mut db, &store.in_progress_query())?;
    let pending = MigrationRunner::new(&mut db, &source, &store).pending(&target.unwrap_or(0));
    close_database(&mut db);
    let pending = pending?;

    Ok(StatusReport {
        database: project.database_path(),
        current_version: pending.current,
        target_version: target,
        pending: pending.pending,
        interrupted,
    })
}

fn print_text(report: &StatusReport) {
    println!("Database:        {}", report.database);
    println!("Current version: {}", report.current_version);
    match report.target_version {
        Some(target) => println!("Target version:  {target}"),
        None => println!("Target version:  (no migrations found)"),
    }

    if report.pending.is_empty() {
        println!("Up to date");
    } else {
        let pending = report
            .pending
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("Pending ({}): {pending}", report.pending.len());
    }

    if let Some(version) = report.interrupted {
        println!("Warning: migration {version} was interrupted; check the database before rerunning");
    }
}
