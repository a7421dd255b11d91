//! Parameterized queries.

use crate::value::SqlValue;
use std::fmt;

/// A named query parameter.
///
/// Backends bind parameters positionally in declaration order; the name is
/// carried for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    pub name: String,
    pub value: SqlValue,
}

impl SqlParam {
    pub fn new(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    sql: String,
    params: Vec<SqlParam>,
}

impl SqlQuery {
    /// Create a query with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.params.push(SqlParam::new(name, value));
        self
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters, in binding order.
    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Parameter values, in binding order.
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.params.iter().map(|p| &p.value)
    }

    /// Render the query for the audit log.
    ///
    /// ```
    /// use sm_db::SqlQuery;
    /// let q = SqlQuery::new("INSERT INTO v VALUES (?)").with_param("p1", 101);
    /// assert_eq!(q.describe(), "INSERT INTO v VALUES (?)\nPARAMETERS:\n   p1: 101");
    /// ```
    pub fn describe(&self) -> String {
        if self.params.is_empty() {
            return self.sql.trim().to_string();
        }
        let params = self
            .params
            .iter()
            .map(|p| format!("   {}: {}", p.name, p.value))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\nPARAMETERS:\n{}", self.sql.trim(), params)
    }
}

impl From<&str> for SqlQuery {
    fn from(sql: &str) -> Self {
        SqlQuery::new(sql)
    }
}

impl From<String> for SqlQuery {
    fn from(sql: String) -> Self {
        SqlQuery::new(sql)
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
