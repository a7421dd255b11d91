//! Error types for sm-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Operation attempted on a closed connection (D004)
    #[error("[D004] Database connection is not open")]
    NotOpen,

    /// BEGIN / COMMIT / ROLLBACK failed (D005)
    #[error("[D005] Transaction failed: {0}")]
    TransactionError(String),

    /// Scalar query returned a value of the wrong type (D006)
    #[error("[D006] Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// Scalar query returned no rows (D007)
    #[error("[D007] Query returned no rows: {0}")]
    NoRows(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured catalog variants, so
        // classification relies on narrow message patterns.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("View with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
