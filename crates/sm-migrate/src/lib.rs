//! sm-migrate - Migration engine for SqlMigrate
//!
//! Brings a database to a target schema version by applying versioned SQL
//! scripts in ascending order. Each migration runs in its own transaction
//! together with the statement that records its version; the first failure
//! rolls that migration back and ends the run.
//!
//! The engine talks to its collaborators through traits:
//! [`MigrationSource`] supplies scripts, [`VersionStore`] supplies the
//! version queries, [`MigrationObserver`] receives the log trail, and
//! [`sm_db::Database`] executes SQL.

pub mod config;
pub mod error;
pub mod observer;
pub mod runner;
pub mod source;
pub mod store;
pub mod version;

pub use config::{MigrateConfig, RunnerConfig, CONFIG_FILE_NAME};
pub use error::{ConfigError, MigrateError, MigrateResult, SourceError, StepError};
pub use observer::{
    BatchKind, ExecutedBatch, LogEntry, LogObserver, MigrationObserver, RecordingObserver,
};
pub use runner::{
    FailedMigration, MigrationRunner, PendingMigrations, RunOutcome, RunPhase, RunStatus,
};
pub use source::{DirectorySource, InMemorySource, MigrationSource};
pub use store::{TableVersionStore, VersionStore};
pub use version::Version;
