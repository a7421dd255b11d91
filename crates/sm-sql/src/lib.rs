//! sm-sql - SQL text layer for SqlMigrate
//!
//! This crate prepares raw migration scripts for execution: comments are
//! removed by a small lexer, then the comment-free text is divided into
//! batches on a line-anchored delimiter keyword (`GO` by default).

pub mod error;
pub mod ident;
pub mod split;
pub mod strip;

pub use error::{SqlError, SqlResult};
pub use ident::{quote_ident, quote_qualified};
pub use split::{
    normalize_batch, split_batches, split_batches_on, split_statements, validate_delimiter,
    DEFAULT_BATCH_DELIMITER,
};
pub use strip::strip_comments;
