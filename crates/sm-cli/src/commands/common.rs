//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use sm_db::{Database, DuckDbDatabase};
use sm_migrate::{DirectorySource, MigrateConfig, MigrationSource, TableVersionStore};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main never prints it.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// A project directory plus its effective configuration.
#[derive(Debug)]
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: MigrateConfig,
}

/// Load the project configuration and apply command-line overrides.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let mut config = match &global.config {
        Some(path) => MigrateConfig::load(Path::new(path))?,
        None => MigrateConfig::load_from_dir(&root)?,
    };

    if let Some(database) = &global.database {
        config.database = database.clone();
    }
    if let Some(dir) = &global.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    config.validate()?;

    Ok(Project { root, config })
}

impl Project {
    pub(crate) fn database_path(&self) -> String {
        self.config.database_path(&self.root)
    }

    pub(crate) fn source(&self) -> DirectorySource {
        DirectorySource::new(self.config.migrations_path(&self.root))
    }

    pub(crate) fn store(&self) -> TableVersionStore {
        TableVersionStore::new(&self.config.version_table)
    }

    /// Open the database and create the version table if needed.
    pub(crate) fn open_database(&self, store: &TableVersionStore) -> Result<DuckDbDatabase> {
        let path = self.database_path();
        let mut db = DuckDbDatabase::new(&path);
        db.open()
            .with_context(|| format!("Failed to open database: {path}"))?;
        db.execute(&store.ensure_table_query())
            .context("Failed to create version table")?;
        Ok(db)
    }
}

/// The explicit target, or the highest version the source provides.
pub(crate) fn resolve_target(
    source: &DirectorySource,
    explicit: Option<i64>,
) -> Result<Option<i64>> {
    match explicit {
        Some(target) => Ok(Some(target)),
        None => Ok(source.latest()?),
    }
}

/// Close the connection, logging rather than failing on error.
pub(crate) fn close_database(db: &mut DuckDbDatabase) {
    if let Err(e) = db.close() {
        log::warn!("Error closing database: {e}");
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
