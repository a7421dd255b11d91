//! sm-db - Database abstraction layer for SqlMigrate
//!
//! This crate provides the synchronous `Database` trait consumed by the
//! migration runner, a scoped `Transaction` guard, parameterized query and
//! value types, and a DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod query;
pub mod traits;
pub mod transaction;
pub mod value;

pub use crate::duckdb::DuckDbDatabase;
pub use error::{DbError, DbResult};
pub use query::{SqlParam, SqlQuery};
pub use traits::{query_scalar_as, Database};
pub use transaction::Transaction;
pub use value::{FromSqlValue, SqlValue};
