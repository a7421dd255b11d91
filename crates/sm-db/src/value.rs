//! Scalar values passed to and read from the database.

use crate::error::{DbError, DbResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;

/// A single SQL value, used for bound parameters and scalar results.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`
    Null,
    /// Boolean
    Boolean(bool),
    /// Any integer type that fits in 64 bits
    Integer(i64),
    /// Floating point
    Real(f64),
    /// Text
    Text(String),
    /// Timestamp without time zone (UTC by convention)
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::Boolean(_) => "BOOLEAN",
            SqlValue::Integer(_) => "INTEGER",
            SqlValue::Real(_) => "REAL",
            SqlValue::Text(_) => "TEXT",
            SqlValue::Timestamp(_) => "TIMESTAMP",
        }
    }

    fn mismatch(self, expected: &'static str) -> DbError {
        DbError::TypeMismatch {
            expected,
            found: format!("{} ({self})", self.type_name()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Boolean(b) => write!(f, "{b}"),
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::Real(r) => write!(f, "{r}"),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Boolean(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(value.into())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value.naive_utc())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Conversion from a scalar query result into a Rust type.
///
/// This is how the runner turns the current-version query result into the
/// caller's version type.
pub trait FromSqlValue: Sized {
    /// Convert `value`, failing with [`DbError::TypeMismatch`] when the value
    /// cannot represent `Self`.
    fn from_sql_value(value: SqlValue) -> DbResult<Self>;
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        Ok(value)
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Integer(i) => Ok(i),
            other => Err(other.mismatch("INTEGER")),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Integer(i) => i32::try_from(i).map_err(|_| DbError::TypeMismatch {
                expected: "32-bit INTEGER",
                found: i.to_string(),
            }),
            other => Err(other.mismatch("INTEGER")),
        }
    }
}

impl FromSqlValue for u32 {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Integer(i) => u32::try_from(i).map_err(|_| DbError::TypeMismatch {
                expected: "unsigned 32-bit INTEGER",
                found: i.to_string(),
            }),
            other => Err(other.mismatch("INTEGER")),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Boolean(b) => Ok(b),
            other => Err(other.mismatch("BOOLEAN")),
        }
    }
}

/// Text columns convert directly; integers are rendered so that string
/// versions can be stored in numeric columns.
impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Text(s) => Ok(s),
            SqlValue::Integer(i) => Ok(i.to_string()),
            other => Err(other.mismatch("TEXT")),
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Timestamp(ts) => Ok(ts),
            other => Err(other.mismatch("TIMESTAMP")),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
