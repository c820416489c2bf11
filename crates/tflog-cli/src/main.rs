//! tflog CLI binary entrypoint.
//!
//! This is the main entry point for the `tflog` command-line tool.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tflog_cli::{Cli, CliError, LogSettings, ViewerConfig};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    let config = match ViewerConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log);

    let mut stdout = io::stdout().lock();
    let result = tflog_cli::run(&cli, &config, &mut stdout)
        .and_then(|()| stdout.flush().map_err(CliError::from));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr so stdout stays clean for JSON and NDJSON.
fn init_tracing(log: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
