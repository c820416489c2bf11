//! # tflog-cli
//!
//! Command-line front end for `tflog-core`.
//!
//! Provides commands for:
//! - Importing JSON-array and NDJSON log files
//! - Browsing records, bodies and read markers
//! - Full-text and filtered search, correlation timelines
//! - NDJSON export
//!
//! Every invocation opens the journal in the configured data directory,
//! runs one command and exits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

use std::io::Write;

use tflog_core::{SharedStore, Store};

pub use cli::{Cli, Commands, Format, PageArgs, PartArg, SearchArgs};
pub use config::{LogSettings, ViewerConfig};
pub use error::CliError;
pub use output::OutputFormat;

use commands::{ExportCommand, ImportCommand, RecordsCommand, SearchCommand};

/// Opens the store and runs one command, writing results to `writer`.
///
/// # Errors
///
/// Returns the first storage, query or output error.
pub fn run<W: Write>(cli: &Cli, config: &ViewerConfig, writer: &mut W) -> Result<(), CliError> {
    let store: SharedStore = Store::open(&config.storage)?.shared();
    let format = OutputFormat::new(cli.format);

    match &cli.command {
        Commands::Import { file } => ImportCommand::new(&store).import(writer, &format, file),
        Commands::Demo => ImportCommand::new(&store).demo(writer, &format),
        Commands::List(page) => RecordsCommand::new(&store).list(writer, &format, page),
        Commands::Get { id } => RecordsCommand::new(&store).get(writer, &format, *id),
        Commands::Body { id, part } => {
            RecordsCommand::new(&store).body(writer, &format, *id, (*part).into())
        }
        Commands::MarkRead { id } => RecordsCommand::new(&store).mark_read(writer, &format, *id),
        Commands::Search(args) => SearchCommand::new(&store).search(writer, &format, args),
        Commands::Timeline => SearchCommand::new(&store).timeline(writer, &format),
        Commands::Export { output } => {
            ExportCommand::new(&store).execute(writer, &format, output.as_deref())
        }
    }
}
