//! Subrun: supervised execution of delegated subagent CLIs.
//!
//! This is the main entry point for the `subrun` CLI. It parses arguments,
//! sets up logging, dispatches to the appropriate command handler, and maps
//! results and errors to exit codes.

mod cli;
mod commands;
pub mod audit;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod info;
pub mod prompt;
pub mod request;
pub mod schema;
pub mod supervisor;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match commands::dispatch(cli.command) {
        Ok(code) => ExitCode::from(exit_codes::to_process_code(code)),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(exit_codes::to_process_code(err.exit_code()))
        }
    }
}

/// Log to stderr at `info` (`debug` with `--verbose`); `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
