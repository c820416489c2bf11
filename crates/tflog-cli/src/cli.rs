//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tflog_core::BodyPart;

/// tflog - Terraform JSON log viewer.
#[derive(Parser, Debug, Clone)]
#[command(name = "tflog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, env = "TFLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the record journal. Overrides the config file.
    #[arg(short, long, env = "TFLOG_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Diagnostic log filter, e.g. `info` or `tflog_core=debug`.
    #[arg(long, env = "TFLOG_LOG")]
    pub log_filter: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Import a JSON array or newline-delimited JSON file.
    Import {
        /// File to import.
        file: PathBuf,
    },

    /// Insert a small demo dataset with request/response bodies.
    Demo,

    /// List records by ascending id.
    List(PageArgs),

    /// Show one record including its raw payload.
    Get {
        /// Record id.
        id: u64,
    },

    /// Show a record's request or response body.
    Body {
        /// Record id.
        id: u64,

        /// Which side to show.
        #[arg(short, long, value_enum, default_value_t = PartArg::Req)]
        part: PartArg,
    },

    /// Mark a record as read.
    MarkRead {
        /// Record id.
        id: u64,
    },

    /// Search records by text, level, correlation id and time range.
    Search(SearchArgs),

    /// Group records by correlation id.
    Timeline,

    /// Export all records as newline-delimited JSON.
    Export {
        /// Destination file; standard output when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Paging arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Maximum rows to return.
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Rows to skip.
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<i64>,
}

/// Arguments for the search command.
#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Full-text query. Terms are ANDed, `OR` separates alternatives,
    /// a trailing `*` matches prefixes.
    #[arg(short, long)]
    pub q: Option<String>,

    /// Exact level, e.g. `ERROR`.
    #[arg(short, long)]
    pub level: Option<String>,

    /// Exact correlation id.
    #[arg(long)]
    pub correlation_id: Option<String>,

    /// Inclusive lower timestamp bound.
    #[arg(long)]
    pub from: Option<String>,

    /// Inclusive upper timestamp bound.
    #[arg(long)]
    pub to: Option<String>,

    /// Paging.
    #[command(flatten)]
    pub page: PageArgs,
}

/// Body side selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PartArg {
    /// Request body.
    Req,
    /// Response body.
    Res,
}

impl From<PartArg> for BodyPart {
    fn from(part: PartArg) -> Self {
        match part {
            PartArg::Req => Self::Req,
            PartArg::Res => Self::Res,
        }
    }
}
