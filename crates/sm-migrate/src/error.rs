//! Error types for sm-migrate

use sm_db::DbError;
use sm_sql::SqlError;
use thiserror::Error;

/// Failure of one phase of a migration run.
///
/// The runner never returns these to its caller as `Err`; they are handed
/// to the observer and recorded in the run outcome.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Current-version query failed (SM001)
    #[error("[SM001] Failed to read current database version: {0}")]
    VersionRead(#[source] DbError),

    /// Enumerating pending migrations failed (SM002)
    #[error("[SM002] Failed to list required migrations: {0}")]
    Listing(#[source] SourceError),

    /// A migration script could not be read (SM003)
    #[error("[SM003] Failed to read migration {version}: {source}")]
    ScriptRead {
        version: String,
        #[source]
        source: SourceError,
    },

    /// A batch, the version update, or the commit failed (SM004)
    #[error("[SM004] Migration {version} failed: {source}")]
    Execution {
        version: String,
        #[source]
        source: StepError,
    },

    /// Rolling back a failed migration failed (SM005)
    #[error("[SM005] Rollback of migration {version} failed: {source}")]
    Rollback {
        version: String,
        #[source]
        source: DbError,
    },

    /// Opening or closing the connection failed (SM006)
    #[error("[SM006] Database connection error: {0}")]
    Connection(#[source] DbError),

    /// Writing or clearing the in-progress marker failed (SM007)
    #[error("[SM007] In-progress marker for migration {version} failed: {source}")]
    Marker {
        version: String,
        #[source]
        source: DbError,
    },

    /// Runner settings cannot work, e.g. an empty batch delimiter (SM008)
    #[error("[SM008] Invalid runner configuration: {0}")]
    InvalidConfig(#[source] SqlError),
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Cause of an [`MigrateError::Execution`] failure.
#[derive(Error, Debug)]
pub enum StepError {
    /// The script could not be lexed (unterminated block comment)
    #[error(transparent)]
    Script(#[from] SqlError),

    /// The database rejected a statement, the version update, or the commit
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Migration source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Migration directory does not exist (SRC001)
    #[error("[SRC001] Migration directory not found: {path}")]
    DirectoryNotFound { path: String },

    /// I/O failure while scanning or reading scripts (SRC002)
    #[error("[SRC002] Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No script exists for the requested version (SRC003)
    #[error("[SRC003] No migration script for version {0}")]
    UnknownVersion(String),

    /// Two scripts claim the same version (SRC004)
    #[error("[SRC004] Duplicate migration version {version}: {first} and {second}")]
    DuplicateVersion {
        version: String,
        first: String,
        second: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    NotFound { path: String },

    /// C002: Configuration file could not be read
    #[error("[C002] Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// C003: Failed to parse configuration file
    #[error("[C003] Failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    /// C004: Invalid configuration value
    #[error("[C004] Invalid config: {message}")]
    Invalid { message: String },
}
