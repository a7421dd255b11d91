//! Version stores.
//!
//! A version store does not touch the database itself: it hands the runner
//! the queries that read and persist the applied version, and the runner
//! executes them on its own connection and transaction.

use chrono::{NaiveDateTime, Timelike, Utc};
use sm_db::SqlQuery;
use sm_sql::quote_qualified;
use std::cell::Cell;

/// Default name of the version table.
pub const DEFAULT_VERSION_TABLE: &str = "schema_migrations";

/// Supplies the queries that read and write the applied version.
pub trait VersionStore<V> {
    /// Scalar query returning the currently applied version.
    fn current_version_query(&self) -> SqlQuery;

    /// Statement recording `version` as applied, or `None` when migration
    /// scripts record their own version.
    fn set_version_query(&self, version: &V) -> Option<SqlQuery>;

    /// Statement recording that `version` is being applied. Executed in
    /// auto-commit mode before the migration's transaction opens.
    fn mark_in_progress_query(&self, _version: &V) -> Option<SqlQuery> {
        None
    }

    /// Statement removing the in-progress record for `version`.
    fn clear_in_progress_query(&self, _version: &V) -> Option<SqlQuery> {
        None
    }
}

/// Stores integer versions as rows of a table:
///
/// ```sql
/// CREATE TABLE schema_migrations (
///     version    BIGINT PRIMARY KEY,
///     applied_at TIMESTAMP NOT NULL
/// );
/// ```
///
/// One row is written per applied migration; the current version is the
/// largest non-negative one. Recording a version the script already wrote
/// overwrites its timestamp. While a migration is in progress a row with
/// the negated version exists.
#[derive(Debug)]
pub struct TableVersionStore {
    table: String,
    last_applied_at: Cell<Option<NaiveDateTime>>,
}

impl TableVersionStore {
    pub fn new(table: &str) -> Self {
        Self {
            table: quote_qualified(table),
            last_applied_at: Cell::new(None),
        }
    }

    /// DDL creating the version table if it does not exist.
    pub fn ensure_table_query(&self) -> SqlQuery {
        SqlQuery::new(format!(
            "CREATE TABLE IF NOT EXISTS {} (version BIGINT PRIMARY KEY, applied_at TIMESTAMP NOT NULL)",
            self.table
        ))
    }

    /// Scalar query returning the version whose in-progress marker is
    /// present, or `NULL` when no migration is marked.
    pub fn in_progress_query(&self) -> SqlQuery {
        SqlQuery::new(format!(
            "SELECT -MAX(version) FROM {} WHERE version < 0",
            self.table
        ))
    }

    /// Timestamp bound by the most recent [`VersionStore::set_version_query`].
    pub fn last_applied_at(&self) -> Option<NaiveDateTime> {
        self.last_applied_at.get()
    }

    fn marker(version: i64) -> Option<i64> {
        (version > 0).then(|| -version)
    }
}

impl Default for TableVersionStore {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION_TABLE)
    }
}

/// Current UTC time truncated to whole seconds, so it compares equal after
/// a round trip through any TIMESTAMP column.
fn now_seconds() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

impl VersionStore<i64> for TableVersionStore {
    fn current_version_query(&self) -> SqlQuery {
        SqlQuery::new(format!(
            "SELECT COALESCE(MAX(version), 0) FROM {} WHERE version >= 0",
            self.table
        ))
    }

    fn set_version_query(&self, version: &i64) -> Option<SqlQuery> {
        let applied_at = now_seconds();
        self.last_applied_at.set(Some(applied_at));
        Some(
            SqlQuery::new(format!(
                "INSERT INTO {} (version, applied_at) VALUES (?, ?) \
                 ON CONFLICT (version) DO UPDATE SET applied_at = excluded.applied_at",
                self.table
            ))
            .with_param("version", *version)
            .with_param("applied_at", applied_at),
        )
    }

    fn mark_in_progress_query(&self, version: &i64) -> Option<SqlQuery> {
        let marker = Self::marker(*version)?;
        Some(
            SqlQuery::new(format!(
                "INSERT OR REPLACE INTO {} (version, applied_at) VALUES (?, ?)",
                self.table
            ))
            .with_param("version", marker)
            .with_param("applied_at", now_seconds()),
        )
    }

    fn clear_in_progress_query(&self, version: &i64) -> Option<SqlQuery> {
        let marker = Self::marker(*version)?;
        Some(
            SqlQuery::new(format!("DELETE FROM {} WHERE version = ?", self.table))
                .with_param("version", marker),
        )
    }
}
