//! Up command implementation

use anyhow::Result;
use sm_migrate::{MigrationRunner, RunStatus};

use crate::cli::{GlobalArgs, UpArgs};
use crate::commands::common::{close_database, load_project, resolve_target, ExitCode};

/// Execute the up command
pub(crate) fn execute(args: &UpArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let source = project.source();
    let store = project.store();

    let Some(target) = resolve_target(&source, args.target)? else {
        println!("No migrations found in {}", source.dir().display());
        return Ok(());
    };

    let mut db = project.open_database(&store)?;
    let outcome = MigrationRunner::new(&mut db, &source, &store)
        .with_config(project.config.runner_config())
        .bring_to_version(target);
    close_database(&mut db);

    let version = outcome
        .final_version()
        .map_or_else(|| "unknown".to_string(), ToString::to_string);

    match outcome.status() {
        RunStatus::UpToDate => {
            println!("Database is up to date at version {version}");
            Ok(())
        }
        RunStatus::Completed => {
            println!(
                "Applied {} migration(s); database is at version {version}",
                outcome.applied.len()
            );
            Ok(())
        }
        RunStatus::Aborted => {
            if let Some(failure) = &outcome.failure {
                eprintln!("Migration failed while {}: {}", failure.phase, failure.error);
                if let Some(rollback) = &failure.rollback_error {
                    eprintln!("  {rollback}");
                }
            }
            println!(
                "Applied {} migration(s) before the failure; database is at version {version}",
                outcome.applied.len()
            );
            Err(ExitCode(1).into())
        }
    }
}
