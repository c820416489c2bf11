//! CLI command implementations.
//!
//! Each submodule implements a group of commands against a shared store:
//! - [`import`] - File import and demo seeding
//! - [`records`] - List, get, body and mark-read
//! - [`search`] - Search and timeline
//! - [`export`] - NDJSON export

pub mod export;
pub mod import;
pub mod records;
pub mod search;

pub use export::ExportCommand;
pub use import::ImportCommand;
pub use records::RecordsCommand;
pub use search::SearchCommand;
