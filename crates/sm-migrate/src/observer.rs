//! Observers receive the runner's log trail.
//!
//! The runner never returns errors to its caller; everything that happens
//! during a run, including failures, is reported here.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;

/// Log target used by [`LogObserver`].
pub const LOG_TARGET: &str = "sqlmigrate";

/// What an executed statement was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// A batch from the migration script
    Script,
    /// The version-store statement recording the new version
    VersionUpdate,
    /// Writing or clearing the in-progress marker
    Marker,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Script => write!(f, "batch"),
            BatchKind::VersionUpdate => write!(f, "version update"),
            BatchKind::Marker => write!(f, "marker"),
        }
    }
}

/// One executed statement, for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedBatch {
    /// Migration version the statement belongs to
    pub version: String,
    /// 1-based position within the migration; markers use 0
    pub ordinal: usize,
    pub kind: BatchKind,
    /// SQL as executed; parameterized statements include their parameters
    pub sql: String,
    pub rows_affected: usize,
}

/// Receives informational messages, errors, and executed statements.
pub trait MigrationObserver {
    fn info(&self, message: &str);

    fn warn(&self, message: &str) {
        self.info(message);
    }

    fn error(&self, error: &dyn Error, message: &str);

    fn batch(&self, batch: &ExecutedBatch);
}

/// Forwards everything to the `log` facade under the `sqlmigrate` target.
///
/// Executed SQL is logged at debug level; the one-line summary of each
/// statement at info.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl MigrationObserver for LogObserver {
    fn info(&self, message: &str) {
        log::info!(target: LOG_TARGET, "{message}");
    }

    fn warn(&self, message: &str) {
        log::warn!(target: LOG_TARGET, "{message}");
    }

    fn error(&self, error: &dyn Error, message: &str) {
        log::error!(target: LOG_TARGET, "{message}: {error}");
    }

    fn batch(&self, batch: &ExecutedBatch) {
        log::info!(
            target: LOG_TARGET,
            "Migration {} {} {}: {} row(s) affected",
            batch.version,
            batch.kind,
            batch.ordinal,
            batch.rows_affected
        );
        log::debug!(target: LOG_TARGET, "{}", batch.sql);
    }
}

/// A recorded observer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Info(String),
    Warn(String),
    Error { message: String, error: String },
    Batch(ExecutedBatch),
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    entries: RefCell<Vec<LogEntry>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// Executed statements, in execution order.
    pub fn batches(&self) -> Vec<ExecutedBatch> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                LogEntry::Batch(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    /// Informational messages, in order.
    pub fn infos(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                LogEntry::Info(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(message, error)` pairs, in order.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                LogEntry::Error { message, error } => Some((message.clone(), error.clone())),
                _ => None,
            })
            .collect()
    }

    /// Text of the most recent error.
    pub fn last_error(&self) -> Option<String> {
        self.errors().pop().map(|(_, error)| error)
    }

    fn push(&self, entry: LogEntry) {
        self.entries.borrow_mut().push(entry);
    }
}

impl MigrationObserver for RecordingObserver {
    fn info(&self, message: &str) {
        self.push(LogEntry::Info(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.push(LogEntry::Warn(message.to_string()));
    }

    fn error(&self, error: &dyn Error, message: &str) {
        self.push(LogEntry::Error {
            message: message.to_string(),
            error: error.to_string(),
        });
    }

    fn batch(&self, batch: &ExecutedBatch) {
        self.push(LogEntry::Batch(batch.clone()));
    }
}
