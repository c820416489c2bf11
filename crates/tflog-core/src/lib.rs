//! # tflog-core
//!
//! Ingestion, redaction, storage and search for Terraform-style JSON logs.
//!
//! This crate provides:
//!
//! - [`format`] - Detects JSON-array vs newline-delimited uploads
//! - [`normalize`] - Maps heterogeneous records onto [`LogRecord`]
//! - [`sanitize`] - Redacts secrets by key name and by value shape
//! - [`SearchIndex`] - Inverted text index kept in step with the store
//! - [`Store`] - Journal-backed record and body storage
//! - [`QueryEngine`] - Filtered search, paging, timeline and export
//! - [`Importer`] - One file in, one atomic batch out
//!
//! ## Example
//!
//! ```rust
//! use tflog_core::{Importer, QueryEngine, SearchParams, Store};
//!
//! let store = Store::in_memory().shared();
//! let importer = Importer::new(store.clone());
//!
//! let input = br#"{"@level":"error","@message":"Error: apply failed","tf_req_id":"r1"}
//! {"@level":"info","@message":"Apply complete","password":"hunter2"}"#;
//! let summary = importer.import_bytes(input)?;
//! assert_eq!(summary.imported, 2);
//!
//! let engine = QueryEngine::new(store);
//! let errors = engine.search(&SearchParams::new().with_level("ERROR"))?;
//! assert_eq!(errors.len(), 1);
//! # Ok::<(), tflog_core::LogError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod format;
pub mod import;
pub mod index;
pub mod journal;
pub mod normalize;
pub mod query;
pub mod sanitize;
pub mod store;
pub mod types;

// Re-export main types
pub use config::StoreConfig;
pub use error::{LogError, Result};
pub use format::{DetectedInput, InputFormat};
pub use import::{ImportSummary, Importer};
pub use index::{SearchIndex, TextQuery};
pub use journal::{FileBackend, Journal, JournalBackend, JournalLock};
pub use normalize::{AliasProbe, NormalizedRecord};
pub use query::{Pagination, QueryEngine, SearchParams};
pub use store::{SharedStore, Store};
pub use types::{
    Bodies, BodyBlob, BodyPart, ExportRow, LogId, LogRecord, LogSummary, NewRecord, TimelineGroup,
};
