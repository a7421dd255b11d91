//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::query::SqlQuery;
use crate::traits::Database;
use crate::value::SqlValue;
use chrono::DateTime;
use duckdb::types::{TimeUnit, ToSql, ToSqlOutput, Value};
use duckdb::Connection;
use sm_sql::split_statements;
use std::path::Path;

const MEMORY_PATH: &str = ":memory:";

/// DuckDB database backend
///
/// The connection is opened lazily by [`Database::open`]. An in-memory
/// database cannot survive a real close, so closing one only marks the
/// handle closed and keeps the underlying connection.
pub struct DuckDbDatabase {
    path: String,
    conn: Option<Connection>,
    open: bool,
}

impl DuckDbDatabase {
    /// Create a closed handle for `path` (`:memory:` for an in-memory database)
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            conn: None,
            open: false,
        }
    }

    /// Create and open an in-memory database
    pub fn open_in_memory() -> DbResult<Self> {
        let mut db = Self::new(MEMORY_PATH);
        db.open()?;
        Ok(db)
    }

    /// Create and open a database file
    pub fn open_path(path: &Path) -> DbResult<Self> {
        let mut db = Self::new(&path.to_string_lossy());
        db.open()?;
        Ok(db)
    }

    /// Database location as given at construction
    pub fn path(&self) -> &str {
        &self.path
    }

    fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }

    /// Borrow the underlying DuckDB connection.
    pub fn connection(&self) -> DbResult<&Connection> {
        match (&self.conn, self.open) {
            (Some(conn), true) => Ok(conn),
            _ => Err(DbError::NotOpen),
        }
    }

    fn control(&self, statement: &str) -> DbResult<()> {
        self.connection()?
            .execute_batch(statement)
            .map_err(|e| DbError::TransactionError(format!("{statement} failed: {e}")))
    }
}

impl Database for DuckDbDatabase {
    fn open(&mut self) -> DbResult<()> {
        if self.open {
            return Ok(());
        }
        if self.conn.is_none() {
            let conn = if self.is_memory() {
                Connection::open_in_memory()
            } else {
                Connection::open(&self.path)
            }
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", self.path)))?;
            self.conn = Some(conn);
        }
        log::debug!("Opened DuckDB database {}", self.path);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> DbResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        if self.is_memory() {
            return Ok(());
        }
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| DbError::ConnectionError(format!("close failed: {e}")))?;
        }
        log::debug!("Closed DuckDB database {}", self.path);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn begin(&mut self) -> DbResult<()> {
        self.control("BEGIN TRANSACTION")
    }

    fn commit(&mut self) -> DbResult<()> {
        self.control("COMMIT")
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.control("ROLLBACK")
    }

    /// Unparameterized text may hold several statements; DuckDB prepares
    /// one at a time, so they run individually and their row counts add up.
    fn execute(&mut self, query: &SqlQuery) -> DbResult<usize> {
        let conn = self.connection()?;
        if !query.params().is_empty() {
            return Ok(conn.execute(query.sql(), duckdb::params_from_iter(query.values()))?);
        }
        let mut rows = 0;
        for statement in split_statements(query.sql()) {
            rows += conn.execute(&statement, [])?;
        }
        Ok(rows)
    }

    fn query_scalar(&mut self, query: &SqlQuery) -> DbResult<SqlValue> {
        let conn = self.connection()?;
        let value = conn
            .query_row(
                query.sql(),
                duckdb::params_from_iter(query.values()),
                |row| row.get::<_, Value>(0),
            )
            .map_err(|e| match e {
                duckdb::Error::QueryReturnedNoRows => DbError::NoRows(query.sql().to_string()),
                other => DbError::from(other),
            })?;
        from_duckdb_value(value)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Null => Value::Null,
            SqlValue::Boolean(b) => Value::Boolean(*b),
            SqlValue::Integer(i) => Value::BigInt(*i),
            SqlValue::Real(r) => Value::Double(*r),
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Timestamp(ts) => {
                Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
            }
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

fn integer<T>(value: T) -> DbResult<SqlValue>
where
    T: TryInto<i64> + std::fmt::Display + Copy,
{
    value
        .try_into()
        .map(SqlValue::Integer)
        .map_err(|_| DbError::TypeMismatch {
            expected: "64-bit INTEGER",
            found: value.to_string(),
        })
}

fn from_duckdb_value(value: Value) -> DbResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Boolean(b) => Ok(SqlValue::Boolean(b)),
        Value::TinyInt(i) => integer(i),
        Value::SmallInt(i) => integer(i),
        Value::Int(i) => integer(i),
        Value::BigInt(i) => Ok(SqlValue::Integer(i)),
        Value::HugeInt(i) => integer(i),
        Value::UTinyInt(i) => integer(i),
        Value::USmallInt(i) => integer(i),
        Value::UInt(i) => integer(i),
        Value::UBigInt(i) => integer(i),
        Value::Float(f) => Ok(SqlValue::Real(f.into())),
        Value::Double(f) => Ok(SqlValue::Real(f)),
        Value::Text(s) => Ok(SqlValue::Text(s)),
        Value::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw.saturating_mul(1_000_000),
                TimeUnit::Millisecond => raw.saturating_mul(1_000),
                TimeUnit::Microsecond => raw,
                TimeUnit::Nanosecond => raw / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(|dt| SqlValue::Timestamp(dt.naive_utc()))
                .ok_or_else(|| DbError::TypeMismatch {
                    expected: "TIMESTAMP",
                    found: format!("out-of-range timestamp {raw}"),
                })
        }
        other => Err(DbError::TypeMismatch {
            expected: "scalar value",
            found: format!("{other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
