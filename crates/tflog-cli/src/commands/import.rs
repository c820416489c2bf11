//! Import and demo command implementation.

use std::io::Write;
use std::path::Path;

use tflog_core::{Importer, SharedStore};

use crate::error::CliError;
use crate::output::{ImportReport, OutputFormat};

/// Handler for `import` and `demo`.
pub struct ImportCommand {
    importer: Importer,
}

impl ImportCommand {
    /// Creates a handler writing to `store`.
    #[must_use]
    pub fn new(store: &SharedStore) -> Self {
        Self {
            importer: Importer::new(store.clone()),
        }
    }

    /// Imports one file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or stored.
    pub fn import<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        path: &Path,
    ) -> Result<(), CliError> {
        let summary = self.importer.import_path(path)?;
        let report = ImportReport {
            source: Some(path.to_path_buf()),
            summary,
        };
        format.write(writer, &report)
    }

    /// Seeds the demo dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be stored.
    pub fn demo<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let summary = self.importer.seed_demo()?;
        format.write(writer, &ImportReport { source: None, summary })
    }
}
