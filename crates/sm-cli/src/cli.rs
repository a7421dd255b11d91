//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// SqlMigrate - apply versioned SQL migrations to a DuckDB database
#[derive(Parser, Debug)]
#[command(name = "sqlmigrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output (debug logging, executed SQL)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the database file (or `:memory:`)
    #[arg(short, long, global = true, env = "SQLMIGRATE_DATABASE")]
    pub database: Option<String>,

    /// Override the migrations directory
    #[arg(short, long, global = true)]
    pub migrations_dir: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Up(UpArgs),

    /// Show the current version and pending migrations
    Status(StatusArgs),

    /// Print a script with comments removed
    Strip(StripArgs),
}

/// Arguments for the up command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Version to migrate to (default: latest available)
    #[arg(short, long)]
    pub target: Option<i64>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Version to compare against (default: latest available)
    #[arg(short, long)]
    pub target: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the strip command
#[derive(Args, Debug)]
pub struct StripArgs {
    /// SQL file to read
    pub file: PathBuf,

    /// Print each batch separately
    #[arg(short, long)]
    pub split: bool,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
