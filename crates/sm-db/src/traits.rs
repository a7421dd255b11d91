//! Database trait definition

use crate::error::DbResult;
use crate::query::SqlQuery;
use crate::value::{FromSqlValue, SqlValue};

/// Synchronous database handle consumed by the migration runner.
///
/// Every call blocks until the database answers. Transactions are flat:
/// at most one is open at a time, and statements executed between
/// [`begin`](Database::begin) and [`commit`](Database::commit) /
/// [`rollback`](Database::rollback) belong to it. Prefer
/// [`Transaction`](crate::Transaction) over calling these directly.
pub trait Database {
    /// Open the connection. Opening an already open connection is a no-op.
    fn open(&mut self) -> DbResult<()>;

    /// Close the connection. Closing a closed connection is a no-op.
    fn close(&mut self) -> DbResult<()>;

    /// Whether the connection is currently open
    fn is_open(&self) -> bool;

    /// Start a transaction
    fn begin(&mut self) -> DbResult<()>;

    /// Commit the open transaction
    fn commit(&mut self) -> DbResult<()>;

    /// Roll back the open transaction
    fn rollback(&mut self) -> DbResult<()>;

    /// Execute a statement (or a batch of statements), returning rows affected
    fn execute(&mut self, query: &SqlQuery) -> DbResult<usize>;

    /// Execute a query and return the first column of the first row
    fn query_scalar(&mut self, query: &SqlQuery) -> DbResult<SqlValue>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Execute a scalar query and convert the result to `T`.
pub fn query_scalar_as<T, D>(db: &mut D, query: &SqlQuery) -> DbResult<T>
where
    T: FromSqlValue,
    D: Database + ?Sized,
{
    let value = db.query_scalar(query)?;
    T::from_sql_value(value)
}
