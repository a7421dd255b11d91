//! Configuration types and parsing for sqlmigrate.yml

use crate::error::{ConfigError, MigrateError, MigrateResult};
use crate::store::DEFAULT_VERSION_TABLE;
use serde::{Deserialize, Serialize};
use sm_sql::{validate_delimiter, DEFAULT_BATCH_DELIMITER};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "sqlmigrate.yml";

const MEMORY_DATABASE: &str = ":memory:";

/// Project configuration from sqlmigrate.yml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    /// DuckDB database file (or `:memory:`), relative to the project directory
    #[serde(default = "default_database")]
    pub database: String,

    /// Directory holding the numbered `*.sql` migration scripts
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Table recording applied versions (may be schema-qualified)
    #[serde(default = "default_version_table")]
    pub version_table: String,

    /// Keyword that, alone on a line, separates batches
    #[serde(default = "default_batch_delimiter")]
    pub batch_delimiter: String,

    /// Write an auto-committed marker row before each migration runs
    #[serde(default)]
    pub in_progress_marker: bool,
}

fn default_database() -> String {
    "sqlmigrate.duckdb".to_string()
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

fn default_version_table() -> String {
    DEFAULT_VERSION_TABLE.to_string()
}

fn default_batch_delimiter() -> String {
    DEFAULT_BATCH_DELIMITER.to_string()
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            migrations_dir: default_migrations_dir(),
            version_table: default_version_table(),
            batch_delimiter: default_batch_delimiter(),
            in_progress_marker: false,
        }
    }
}

impl MigrateConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Load `sqlmigrate.yml` from `dir`, falling back to defaults when the
    /// file does not exist.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            log::debug!("No {} in {}; using defaults", CONFIG_FILE_NAME, dir.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml, "<inline>")
    }

    fn parse(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_delimiter(&self.batch_delimiter).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
        if self.version_table.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "version_table must not be empty".to_string(),
            });
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "database must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Database location resolved against `base`; `:memory:` is kept as is.
    pub fn database_path(&self, base: &Path) -> String {
        if self.database == MEMORY_DATABASE {
            return self.database.clone();
        }
        base.join(&self.database).display().to_string()
    }

    /// Migrations directory resolved against `base`.
    pub fn migrations_path(&self, base: &Path) -> PathBuf {
        base.join(&self.migrations_dir)
    }

    /// Runner settings derived from this configuration.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            batch_delimiter: self.batch_delimiter.clone(),
            in_progress_marker: self.in_progress_marker,
        }
    }
}

/// Settings that change how the runner executes a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Keyword that, alone on a line, separates batches
    pub batch_delimiter: String,
    /// Write the version store's in-progress marker before each migration
    pub in_progress_marker: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_delimiter: DEFAULT_BATCH_DELIMITER.to_string(),
            in_progress_marker: false,
        }
    }
}

impl RunnerConfig {
    /// Reject a delimiter that cannot be matched as a whole line.
    pub fn validate(&self) -> MigrateResult<()> {
        validate_delimiter(&self.batch_delimiter).map_err(MigrateError::InvalidConfig)
    }

    /// Set the batch delimiter; checked by [`RunnerConfig::validate`] before
    /// a run starts.
    pub fn with_batch_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.batch_delimiter = delimiter.into();
        self
    }

    pub fn with_in_progress_marker(mut self, enabled: bool) -> Self {
        self.in_progress_marker = enabled;
        self
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
