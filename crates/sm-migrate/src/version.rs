//! The version bound used throughout the engine.

use sm_db::FromSqlValue;
use std::fmt;

/// A schema version identifier.
///
/// The engine only compares versions, prints them, and converts the
/// current-version query result into one. Integers and strings both
/// qualify; any type meeting the bounds does automatically.
pub trait Version: Ord + Clone + fmt::Display + fmt::Debug + FromSqlValue {}

impl<T> Version for T where T: Ord + Clone + fmt::Display + fmt::Debug + FromSqlValue {}
