//! Migration runner.
//!
//! [`MigrationRunner::bring_to_version`] drives one run:
//!
//! ```text
//! Idle → ReadingCurrentVersion → ListingPending
//!      → for each pending version:
//!          ReadingScript → BeginningTransaction → Stripping → Splitting
//!          → ExecutingBatches → UpdatingVersion → Committing
//!      → Done
//! ```
//!
//! Any failure moves the run to `Aborted`. A failure after the migration's
//! transaction opened rolls that migration back; migrations committed
//! earlier in the run stay applied. The run never returns an error: the
//! observer sees every step and failure, and the returned [`RunOutcome`]
//! summarizes what happened.

use crate::config::RunnerConfig;
use crate::error::{MigrateError, MigrateResult, StepError};
use crate::observer::{BatchKind, ExecutedBatch, LogObserver, MigrationObserver};
use crate::source::MigrationSource;
use crate::store::VersionStore;
use crate::version::Version;
use sm_db::{query_scalar_as, Database, SqlQuery, Transaction};
use sm_sql::{normalize_batch, split_batches_on, strip_comments};
use std::fmt;

static LOG_OBSERVER: LogObserver = LogObserver;

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Connecting,
    ReadingCurrentVersion,
    ListingPending,
    ReadingScript,
    MarkingInProgress,
    BeginningTransaction,
    Stripping,
    Splitting,
    ExecutingBatches,
    UpdatingVersion,
    Committing,
    Done,
    Aborted,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunPhase::Idle => "checking the configuration",
            RunPhase::Connecting => "opening the connection",
            RunPhase::ReadingCurrentVersion => "reading the current version",
            RunPhase::ListingPending => "listing pending migrations",
            RunPhase::ReadingScript => "reading the script",
            RunPhase::MarkingInProgress => "marking the migration in progress",
            RunPhase::BeginningTransaction => "beginning the transaction",
            RunPhase::Stripping => "stripping comments",
            RunPhase::Splitting => "splitting batches",
            RunPhase::ExecutingBatches => "executing batches",
            RunPhase::UpdatingVersion => "updating the version",
            RunPhase::Committing => "committing",
            RunPhase::Done => "done",
            RunPhase::Aborted => "aborted",
        };
        f.write_str(text)
    }
}

/// The failure that ended a run.
#[derive(Debug)]
pub struct FailedMigration<V> {
    /// Migration being applied, if the run got that far
    pub version: Option<V>,
    /// Phase in which the failure happened
    pub phase: RunPhase,
    /// The primary error
    pub error: MigrateError,
    /// Set when rolling back after `error` failed too
    pub rollback_error: Option<MigrateError>,
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing needed applying
    UpToDate,
    /// Every pending migration was applied
    Completed,
    /// The run stopped on a failure
    Aborted,
}

/// Summary of one [`MigrationRunner::bring_to_version`] call.
#[derive(Debug)]
pub struct RunOutcome<V> {
    pub target: V,
    /// Version read at the start of the run
    pub starting_version: Option<V>,
    /// Migrations committed during the run, in order
    pub applied: Vec<V>,
    pub failure: Option<FailedMigration<V>>,
}

impl<V> RunOutcome<V> {
    fn new(target: V) -> Self {
        Self {
            target,
            starting_version: None,
            applied: Vec::new(),
            failure: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.failure.is_some() {
            RunStatus::Aborted
        } else if self.applied.is_empty() {
            RunStatus::UpToDate
        } else {
            RunStatus::Completed
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Version the database is at after the run, when known.
    pub fn final_version(&self) -> Option<&V> {
        self.applied.last().or(self.starting_version.as_ref())
    }
}

/// Current version plus the versions a run would apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigrations<V> {
    pub current: V,
    pub pending: Vec<V>,
}

/// Applies pending migrations to a database.
///
/// The runner holds the database mutably for its whole lifetime; nothing
/// else can use the connection while a run is in progress.
pub struct MigrationRunner<'a, V: Version, D: Database + ?Sized> {
    db: &'a mut D,
    source: &'a dyn MigrationSource<V>,
    store: &'a dyn VersionStore<V>,
    observer: &'a dyn MigrationObserver,
    config: RunnerConfig,
}

impl<'a, V: Version, D: Database + ?Sized> MigrationRunner<'a, V, D> {
    /// Create a runner logging through [`LogObserver`] with default settings.
    pub fn new(
        db: &'a mut D,
        source: &'a dyn MigrationSource<V>,
        store: &'a dyn VersionStore<V>,
    ) -> Self {
        Self {
            db,
            source,
            store,
            observer: &LOG_OBSERVER,
            config: RunnerConfig::default(),
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn MigrationObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply every pending migration up to and including `target`.
    ///
    /// Opens the connection if it is closed and closes it again afterwards.
    /// Stops at the first failure; see the module docs for the protocol.
    pub fn bring_to_version(&mut self, target: V) -> RunOutcome<V> {
        let mut outcome = RunOutcome::new(target);

        if let Err(e) = self.config.validate() {
            outcome.failure = Some(failure(self.observer, None, RunPhase::Idle, e));
            return outcome;
        }

        let was_open = self.db.is_open();
        if !was_open {
            self.observer.info("Opening database connection");
            if let Err(e) = self.db.open() {
                let failed = failure(
                    self.observer,
                    None,
                    RunPhase::Connecting,
                    MigrateError::Connection(e),
                );
                outcome.failure = Some(failed);
                return outcome;
            }
        }

        self.run(&mut outcome);

        if !was_open {
            self.close_connection();
        }
        outcome
    }

    /// Read the current version and list what a run up to `target` would
    /// apply, without executing anything.
    pub fn pending(&mut self, target: &V) -> MigrateResult<PendingMigrations<V>> {
        self.config.validate()?;
        let was_open = self.db.is_open();
        if !was_open {
            self.db.open().map_err(MigrateError::Connection)?;
        }

        let result = self.read_current_version().and_then(|current| {
            let pending = self.list_pending(&current, target)?;
            Ok(PendingMigrations { current, pending })
        });

        if !was_open {
            self.close_connection();
        }
        result
    }

    fn run(&mut self, outcome: &mut RunOutcome<V>) {
        let target = outcome.target.clone();

        self.observer.info("Getting current database version");
        let current = match self.read_current_version() {
            Ok(current) => current,
            Err(e) => {
                outcome.failure = Some(failure(
                    self.observer,
                    None,
                    RunPhase::ReadingCurrentVersion,
                    e,
                ));
                return;
            }
        };
        self.observer
            .info(&format!("Current database version is {current}"));
        outcome.starting_version = Some(current.clone());

        self.observer.info(&format!(
            "Listing required migrations after {current} up to {target}"
        ));
        let pending = match self.list_pending(&current, &target) {
            Ok(pending) => pending,
            Err(e) => {
                outcome.failure = Some(failure(self.observer, None, RunPhase::ListingPending, e));
                return;
            }
        };
        if pending.is_empty() {
            self.observer.info("No migrations required");
            return;
        }
        self.observer.info(&format!(
            "Migrations required: {}",
            pending
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ));

        for version in pending {
            if let Err(failed) = self.apply(&version) {
                outcome.failure = Some(failed);
                return;
            }
            self.observer.info(&format!("Finished migration {version}"));
            outcome.applied.push(version);
        }
    }

    fn read_current_version(&mut self) -> MigrateResult<V> {
        let query = self.store.current_version_query();
        query_scalar_as(&mut *self.db, &query).map_err(MigrateError::VersionRead)
    }

    fn list_pending(&self, current: &V, target: &V) -> MigrateResult<Vec<V>> {
        let listed = self
            .source
            .list_required(current, target)
            .map_err(MigrateError::Listing)?;
        Ok(self.order_pending(listed, current, target))
    }

    /// Sort, deduplicate, and range-check whatever the source returned.
    fn order_pending(&self, mut versions: Vec<V>, current: &V, target: &V) -> Vec<V> {
        let listed = versions.len();
        versions.retain(|v| v > current && v <= target);
        if versions.len() < listed {
            self.observer.warn(&format!(
                "Ignoring {} listed version(s) not after {current} or beyond {target}",
                listed - versions.len()
            ));
        }

        versions.sort();
        let in_range = versions.len();
        versions.dedup();
        if versions.len() < in_range {
            self.observer.warn(&format!(
                "Ignoring {} duplicate version(s)",
                in_range - versions.len()
            ));
        }
        versions
    }

    fn apply(&mut self, version: &V) -> Result<(), FailedMigration<V>> {
        self.observer.info(&format!("Starting migration {version}"));

        let sql = self.source.read_script(version).map_err(|source| {
            failure(
                self.observer,
                Some(version.clone()),
                RunPhase::ReadingScript,
                MigrateError::ScriptRead {
                    version: version.to_string(),
                    source,
                },
            )
        })?;

        if self.config.in_progress_marker {
            self.mark_in_progress(version).map_err(|e| {
                failure(
                    self.observer,
                    Some(version.clone()),
                    RunPhase::MarkingInProgress,
                    e,
                )
            })?;
        }

        let result = self.run_in_transaction(version, &sql);
        if result.is_err() && self.config.in_progress_marker {
            self.clear_in_progress(version);
        }
        result
    }

    fn run_in_transaction(&mut self, version: &V, sql: &str) -> Result<(), FailedMigration<V>> {
        let observer = self.observer;
        let execution_error = |source: StepError| MigrateError::Execution {
            version: version.to_string(),
            source,
        };

        observer.info("Beginning transaction");
        let mut tx = Transaction::begin(&mut *self.db).map_err(|e| {
            failure(
                observer,
                Some(version.clone()),
                RunPhase::BeginningTransaction,
                execution_error(StepError::Database(e)),
            )
        })?;

        let Err((phase, source)) =
            execute_steps(&mut tx, version, sql, self.store, observer, &self.config)
        else {
            return Ok(());
        };

        let mut failed = failure(
            observer,
            Some(version.clone()),
            phase,
            execution_error(source),
        );
        failed.rollback_error = rollback(&mut tx, observer, version);
        Err(failed)
    }

    /// Write the in-progress marker in auto-commit mode.
    fn mark_in_progress(&mut self, version: &V) -> MigrateResult<()> {
        let Some(query) = self.store.mark_in_progress_query(version) else {
            return Ok(());
        };
        self.observer
            .info(&format!("Marking migration {version} as in progress"));
        let rows_affected = self
            .db
            .execute(&query)
            .map_err(|source| MigrateError::Marker {
                version: version.to_string(),
                source,
            })?;
        self.observer.batch(&ExecutedBatch {
            version: version.to_string(),
            ordinal: 0,
            kind: BatchKind::Marker,
            sql: query.describe(),
            rows_affected,
        });
        Ok(())
    }

    /// Remove the in-progress marker after a rolled-back migration.
    fn clear_in_progress(&mut self, version: &V) {
        let Some(query) = self.store.clear_in_progress_query(version) else {
            return;
        };
        self.observer
            .info(&format!("Clearing in-progress marker for migration {version}"));
        match self.db.execute(&query) {
            Ok(rows_affected) => self.observer.batch(&ExecutedBatch {
                version: version.to_string(),
                ordinal: 0,
                kind: BatchKind::Marker,
                sql: query.describe(),
                rows_affected,
            }),
            Err(source) => {
                let err = MigrateError::Marker {
                    version: version.to_string(),
                    source,
                };
                self.observer
                    .error(&err, "Error clearing in-progress marker");
            }
        }
    }

    fn close_connection(&mut self) {
        self.observer.info("Closing database connection");
        if let Err(e) = self.db.close() {
            self.observer.error(
                &MigrateError::Connection(e),
                "Error closing database connection",
            );
        }
    }
}

/// Log `error` and package it as the run's failure.
fn failure<V: fmt::Display>(
    observer: &dyn MigrationObserver,
    version: Option<V>,
    phase: RunPhase,
    error: MigrateError,
) -> FailedMigration<V> {
    let message = match &version {
        Some(v) => format!("Exception encountered while running migration {v} ({phase})"),
        None => format!("Exception encountered while {phase}"),
    };
    observer.error(&error, &message);
    FailedMigration {
        version,
        phase,
        error,
        rollback_error: None,
    }
}

/// Strip, split, execute, record the version, and commit.
fn execute_steps<V: Version, D: Database + ?Sized>(
    tx: &mut Transaction<'_, D>,
    version: &V,
    sql: &str,
    store: &dyn VersionStore<V>,
    observer: &dyn MigrationObserver,
    config: &RunnerConfig,
) -> Result<(), (RunPhase, StepError)> {
    let label = version.to_string();

    let stripped =
        strip_comments(sql).map_err(|e| (RunPhase::Stripping, StepError::Script(e)))?;
    let batches = split_batches_on(&stripped, &config.batch_delimiter);

    observer.info(&format!(
        "Running migration {version}: {} batch(es)",
        batches.len()
    ));
    for (index, batch) in batches.iter().enumerate() {
        let sql = normalize_batch(batch);
        let rows_affected = tx
            .execute(&SqlQuery::new(sql.as_str()))
            .map_err(|e| (RunPhase::ExecutingBatches, StepError::Database(e)))?;
        observer.batch(&ExecutedBatch {
            version: label.clone(),
            ordinal: index + 1,
            kind: BatchKind::Script,
            sql,
            rows_affected,
        });
    }

    match store.set_version_query(version) {
        Some(query) => {
            observer.info(&format!("Updating database version to {version}"));
            let rows_affected = tx
                .execute(&query)
                .map_err(|e| (RunPhase::UpdatingVersion, StepError::Database(e)))?;
            observer.batch(&ExecutedBatch {
                version: label.clone(),
                ordinal: batches.len() + 1,
                kind: BatchKind::VersionUpdate,
                sql: query.describe(),
                rows_affected,
            });
        }
        None => observer.info("No version update statement; the script records its own version"),
    }

    if config.in_progress_marker {
        if let Some(query) = store.clear_in_progress_query(version) {
            let rows_affected = tx
                .execute(&query)
                .map_err(|e| (RunPhase::UpdatingVersion, StepError::Database(e)))?;
            observer.batch(&ExecutedBatch {
                version: label,
                ordinal: 0,
                kind: BatchKind::Marker,
                sql: query.describe(),
                rows_affected,
            });
        }
    }

    observer.info("Committing transaction");
    tx.commit()
        .map_err(|e| (RunPhase::Committing, StepError::Database(e)))
}

/// Roll back after a failure. A rollback error is logged and returned but
/// never replaces the failure that caused it.
fn rollback<V: fmt::Display, D: Database + ?Sized>(
    tx: &mut Transaction<'_, D>,
    observer: &dyn MigrationObserver,
    version: &V,
) -> Option<MigrateError> {
    observer.info("Rolling back transaction");
    match tx.rollback() {
        Ok(()) => {
            observer.info("Rolled back transaction successfully");
            None
        }
        Err(source) => {
            let err = MigrateError::Rollback {
                version: version.to_string(),
                source,
            };
            observer.error(&err, "Error rolling back transaction");
            Some(err)
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
