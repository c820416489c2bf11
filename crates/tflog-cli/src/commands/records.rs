//! Record browsing commands: list, get, body and mark-read.

use std::io::Write;

use tflog_core::{BodyPart, LogId, QueryEngine, SharedStore};

use crate::cli::PageArgs;
use crate::error::CliError;
use crate::output::{BodyView, MarkReadReport, OutputFormat, RecordDetail, RecordList};

/// Handler for per-record commands.
pub struct RecordsCommand {
    engine: QueryEngine,
}

impl RecordsCommand {
    /// Creates a handler over `store`.
    #[must_use]
    pub fn new(store: &SharedStore) -> Self {
        Self {
            engine: QueryEngine::new(store.clone()),
        }
    }

    /// Lists record summaries by id.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid paging.
    pub fn list<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        page: &PageArgs,
    ) -> Result<(), CliError> {
        let records = self.engine.list(page.limit, page.offset)?;
        format.write(writer, &RecordList { records })
    }

    /// Shows one full record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist.
    pub fn get<W: Write>(&self, writer: &mut W, format: &OutputFormat, id: u64) -> Result<(), CliError> {
        let record = self.engine.store().get(LogId(id))?;
        format.write(writer, &RecordDetail { record })
    }

    /// Shows one side of a record's bodies.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no body row.
    pub fn body<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        id: u64,
        part: BodyPart,
    ) -> Result<(), CliError> {
        let id = LogId(id);
        let body = self.engine.store().get_body(id, part)?;
        format.write(writer, &BodyView { id, part, body })
    }

    /// Marks a record as read.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or the mark cannot be
    /// persisted.
    pub fn mark_read<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        id: u64,
    ) -> Result<(), CliError> {
        let id = LogId(id);
        self.engine.store().mark_read(id)?;
        format.write(writer, &MarkReadReport { id, is_read: true })
    }
}
