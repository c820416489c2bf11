//! NDJSON export command.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tflog_core::{QueryEngine, SharedStore};

use crate::error::CliError;
use crate::output::{ExportReport, OutputFormat};

/// Handler for `export`.
pub struct ExportCommand {
    engine: QueryEngine,
}

impl ExportCommand {
    /// Creates a handler over `store`.
    #[must_use]
    pub fn new(store: &SharedStore) -> Self {
        Self {
            engine: QueryEngine::new(store.clone()),
        }
    }

    /// Writes the export to `output`, or straight to `writer` when no file
    /// is given. A file export prints a short report instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be written.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        output: Option<&Path>,
    ) -> Result<(), CliError> {
        match output {
            None => {
                self.engine.export(writer)?;
                Ok(())
            }
            Some(path) => {
                let file = File::create(path)?;
                let rows = self.engine.export(BufWriter::new(file))?;
                tracing::info!(path = %path.display(), rows, "export written");
                format.write(
                    writer,
                    &ExportReport {
                        path: path.to_path_buf(),
                        rows,
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tflog_core::{Importer, Store};

    fn command() -> ExportCommand {
        let store = Store::in_memory().shared();
        Importer::new(store.clone()).seed_demo().expect("seed demo");
        ExportCommand::new(&store)
    }

    #[test]
    fn export_to_writer() {
        let mut out = Vec::new();
        command()
            .execute(&mut out, &OutputFormat::default(), None)
            .expect("export");
        let text = String::from_utf8(out).expect("utf-8");
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|line| serde_json::from_str::<serde_json::Value>(line).is_ok()));
    }

    #[test]
    fn export_to_file_reports_rows() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("export.ndjson");
        let mut out = Vec::new();
        command()
            .execute(&mut out, &OutputFormat::default(), Some(&path))
            .expect("export");

        let written = std::fs::read_to_string(&path).expect("read export");
        assert_eq!(written.lines().count(), 4);
        assert!(String::from_utf8_lossy(&out).contains("Exported 4 record(s)"));
    }
}
