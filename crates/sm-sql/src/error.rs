//! Error types for sm-sql

use thiserror::Error;

/// SQL text processing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    /// Script ended inside a `/* ... */` comment (Q001)
    #[error("[Q001] Unterminated multi-line comment opened at line {line}")]
    MalformedComment { line: usize },

    /// Batch delimiter keyword is unusable (Q002)
    #[error("[Q002] Invalid batch delimiter '{0}': must be a single non-empty word")]
    InvalidDelimiter(String),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
