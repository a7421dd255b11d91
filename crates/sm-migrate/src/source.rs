//! Migration sources.
//!
//! A source knows which migration versions exist and returns the raw SQL
//! for each. Scripts are read on demand and never cached, so a source
//! always reflects the current state of its backing store.

use crate::error::SourceError;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// Supplies migration versions and their scripts.
pub trait MigrationSource<V: Ord> {
    /// Every version this source can supply, in ascending order.
    fn available(&self) -> Result<Vec<V>, SourceError>;

    /// Raw SQL text of the script for `version`.
    fn read_script(&self, version: &V) -> Result<String, SourceError>;

    /// Versions strictly greater than `current` and no greater than
    /// `target`, in ascending order.
    fn list_required(&self, current: &V, target: &V) -> Result<Vec<V>, SourceError> {
        Ok(self
            .available()?
            .into_iter()
            .filter(|v| v > current && v <= target)
            .collect())
    }

    /// Highest available version, if any.
    fn latest(&self) -> Result<Option<V>, SourceError> {
        Ok(self.available()?.into_iter().max())
    }
}

/// Migrations held in memory, keyed by version.
///
/// Suited to scripts embedded with `include_str!`:
///
/// ```
/// use sm_migrate::{InMemorySource, MigrationSource};
/// let source = InMemorySource::new()
///     .with_migration(1_i64, "CREATE TABLE a (id INTEGER);")
///     .with_migration(2_i64, "CREATE TABLE b (id INTEGER);");
/// assert_eq!(source.list_required(&1, &5).unwrap(), vec![2]);
/// ```
#[derive(Debug, Clone)]
pub struct InMemorySource<V: Ord> {
    scripts: BTreeMap<V, String>,
}

impl<V: Ord> InMemorySource<V> {
    pub fn new() -> Self {
        Self {
            scripts: BTreeMap::new(),
        }
    }

    /// Add (or replace) the script for `version`.
    pub fn with_migration(mut self, version: V, sql: impl Into<String>) -> Self {
        self.insert(version, sql);
        self
    }

    /// Add (or replace) the script for `version`.
    pub fn insert(&mut self, version: V, sql: impl Into<String>) {
        self.scripts.insert(version, sql.into());
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl<V: Ord> Default for InMemorySource<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Ord, S: Into<String>> FromIterator<(V, S)> for InMemorySource<V> {
    fn from_iter<I: IntoIterator<Item = (V, S)>>(iter: I) -> Self {
        Self {
            scripts: iter.into_iter().map(|(v, s)| (v, s.into())).collect(),
        }
    }
}

impl<V> MigrationSource<V> for InMemorySource<V>
where
    V: Ord + Clone + std::fmt::Display,
{
    fn available(&self) -> Result<Vec<V>, SourceError> {
        Ok(self.scripts.keys().cloned().collect())
    }

    fn read_script(&self, version: &V) -> Result<String, SourceError> {
        self.scripts
            .get(version)
            .cloned()
            .ok_or_else(|| SourceError::UnknownVersion(version.to_string()))
    }

    fn list_required(&self, current: &V, target: &V) -> Result<Vec<V>, SourceError> {
        if current >= target {
            return Ok(Vec::new());
        }
        Ok(self
            .scripts
            .range((Bound::Excluded(current), Bound::Included(target)))
            .map(|(v, _)| v.clone())
            .collect())
    }
}

/// Migrations stored as `*.sql` files in a directory.
///
/// The version is the run of ASCII digits at the start of the file name:
/// `0101_add_messages.sql` is version 101. Files without a leading number
/// or without a `.sql` extension are ignored. The directory is rescanned on
/// every call.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan(&self) -> Result<BTreeMap<i64, PathBuf>, SourceError> {
        if !self.dir.is_dir() {
            return Err(SourceError::DirectoryNotFound {
                path: self.dir.display().to_string(),
            });
        }
        let io_err = |source| SourceError::Io {
            path: self.dir.display().to_string(),
            source,
        };

        let mut scripts: BTreeMap<i64, PathBuf> = BTreeMap::new();
        for entry in fs::read_dir(&self.dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(version) = script_version(&path) else {
                log::debug!("Ignoring non-migration file {}", path.display());
                continue;
            };
            if let Some(existing) = scripts.get(&version) {
                return Err(SourceError::DuplicateVersion {
                    version: version.to_string(),
                    first: existing.display().to_string(),
                    second: path.display().to_string(),
                });
            }
            scripts.insert(version, path);
        }
        Ok(scripts)
    }
}

/// Parse the version from a migration file name.
fn script_version(path: &Path) -> Option<i64> {
    let is_sql = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("sql"));
    if !is_sql {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

impl MigrationSource<i64> for DirectorySource {
    fn available(&self) -> Result<Vec<i64>, SourceError> {
        Ok(self.scan()?.into_keys().collect())
    }

    fn read_script(&self, version: &i64) -> Result<String, SourceError> {
        let scripts = self.scan()?;
        let path = scripts
            .get(version)
            .ok_or_else(|| SourceError::UnknownVersion(version.to_string()))?;
        fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
