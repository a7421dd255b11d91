//! SqlMigrate CLI - apply versioned SQL migrations to a DuckDB database

use clap::Parser;
use std::process;

mod cli;
mod commands;

use cli::Cli;
use commands::common::ExitCode;
use commands::{status, strip, up};

fn main() -> process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        cli::Commands::Up(args) => up::execute(args, &cli.global),
        cli::Commands::Status(args) => status::execute(args, &cli.global),
        cli::Commands::Strip(args) => strip::execute(args, &cli.global),
    };

    match result {
        Ok(()) => process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(code) => process::ExitCode::from(u8::try_from(code.0).unwrap_or(1)),
            None => {
                eprintln!("Error: {err:#}");
                process::ExitCode::FAILURE
            }
        },
    }
}

/// Route the `log` facade to stderr. `RUST_LOG` overrides the defaults.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "debug"
    } else {
        "warn,sqlmigrate=info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_target(false)
        .init();
}
