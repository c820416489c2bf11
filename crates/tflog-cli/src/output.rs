//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tflog_core::{BodyPart, ImportSummary, LogId, LogRecord, LogSummary, TimelineGroup};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Result of an import or demo seed.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Imported file, absent for the demo dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Detection and commit counts.
    #[serde(flatten)]
    pub summary: ImportSummary,
}

impl TableDisplay for ImportReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match &self.source {
            Some(path) => writeln!(writer, "Imported {} record(s) from {}", self.summary.imported, path.display())?,
            None => writeln!(writer, "Inserted {} demo record(s)", self.summary.imported)?,
        }
        writeln!(writer, "  Format:   {}", self.summary.format.as_str())?;
        writeln!(writer, "  Skipped:  {}", self.summary.skipped)?;
        Ok(())
    }
}

/// A page of record summaries.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RecordList {
    /// Summaries in display order.
    pub records: Vec<LogSummary>,
}

impl TableDisplay for RecordList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.records.is_empty() {
            writeln!(writer, "No records")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:>6}  {:<24}  {:<5}  {:<12}  {:<16}  {:<5}  {}",
            "ID", "TIMESTAMP", "LEVEL", "SECTION", "CORRELATION", "FLAGS", "SUMMARY"
        )?;
        writeln!(writer, "{}", "─".repeat(110))?;

        for record in &self.records {
            writeln!(
                writer,
                "{:>6}  {:<24}  {:<5}  {:<12}  {:<16}  {:<5}  {}",
                record.id,
                truncate(&record.ts, 24),
                truncate(&record.level, 5),
                truncate(record.section.as_deref().unwrap_or("-"), 12),
                truncate(record.correlation_id.as_deref().unwrap_or("-"), 16),
                flags(record),
                truncate(&record.summary, 60)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} record(s)", self.records.len())?;
        Ok(())
    }
}

fn flags(record: &LogSummary) -> String {
    [
        (record.has_req_body, 'Q'),
        (record.has_res_body, 'S'),
        (record.is_read, 'R'),
    ]
    .iter()
    .map(|(set, c)| if *set { *c } else { '.' })
    .collect()
}

/// A single record with its raw payload.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RecordDetail {
    /// The record.
    pub record: LogRecord,
}

impl TableDisplay for RecordDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let r = &self.record;
        writeln!(writer, "Record {}", r.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Timestamp:       {}", r.ts)?;
        writeln!(writer, "Level:           {}", r.level)?;
        writeln!(writer, "Section:         {}", r.section.as_deref().unwrap_or("-"))?;
        writeln!(writer, "Correlation ID:  {}", r.correlation_id.as_deref().unwrap_or("-"))?;
        writeln!(writer, "Request body:    {}", yes_no(r.has_req_body))?;
        writeln!(writer, "Response body:   {}", yes_no(r.has_res_body))?;
        writeln!(writer, "Read:            {}", yes_no(r.is_read))?;
        writeln!(writer)?;
        writeln!(writer, "Summary")?;
        writeln!(writer, "  {}", r.summary)?;
        writeln!(writer)?;
        writeln!(writer, "Payload")?;
        writeln!(writer, "  {}", r.raw_payload)?;
        Ok(())
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// One side of a record's bodies.
#[derive(Debug, Clone, Serialize)]
pub struct BodyView {
    /// Record id.
    pub id: LogId,
    /// Side shown.
    pub part: BodyPart,
    /// Payload, `None` when this side is empty.
    pub body: Option<Value>,
}

impl TableDisplay for BodyView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match &self.body {
            Some(body) => {
                let pretty = serde_json::to_string_pretty(body)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer, "{pretty}")?;
            }
            None => writeln!(writer, "Record {} has no {} body", self.id, self.part)?,
        }
        Ok(())
    }
}

/// Confirmation of a read mark.
#[derive(Debug, Clone, Serialize)]
pub struct MarkReadReport {
    /// Record id.
    pub id: LogId,
    /// Always true once the command succeeds.
    pub is_read: bool,
}

impl TableDisplay for MarkReadReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Record {} marked as read", self.id)?;
        Ok(())
    }
}

/// Correlation id groups.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    /// Groups ordered by start.
    pub groups: Vec<TimelineGroup>,
}

impl TableDisplay for Timeline {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.groups.is_empty() {
            writeln!(writer, "No correlated records")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<36}  {:<24}  {:<24}  {:>6}",
            "CORRELATION ID", "START", "END", "COUNT"
        )?;
        writeln!(writer, "{}", "─".repeat(96))?;

        for group in &self.groups {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<24}  {:>6}",
                truncate(&group.correlation_id, 36),
                truncate(&group.start, 24),
                truncate(&group.end, 24),
                group.count
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} group(s)", self.groups.len())?;
        Ok(())
    }
}

/// Result of an export to a file.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// Destination file.
    pub path: PathBuf,
    /// Rows written.
    pub rows: usize,
}

impl TableDisplay for ExportReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Exported {} record(s) to {}", self.rows, self.path.display())?;
        Ok(())
    }
}

/// Truncates to `max_len` characters, marking the cut with `...`.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tflog_core::{Bodies, InputFormat, NewRecord};

    fn record(id: u64) -> LogRecord {
        LogRecord::from_new(
            LogId(id),
            NewRecord::new("2024-01-01T00:00:00Z", "ERROR", "apply failed")
                .with_section("apply_end")
                .with_correlation_id("req-1"),
            &Bodies::new(Some(json!({"a": 1})), None),
        )
    }

    fn render<T: Serialize + TableDisplay>(format: Format, value: &T) -> String {
        let mut buf = Vec::new();
        OutputFormat::new(format)
            .write(&mut buf, value)
            .expect("write output");
        String::from_utf8(buf).expect("utf-8 output")
    }

    #[test]
    fn record_list_table() {
        let list = RecordList {
            records: vec![record(1).summary_view(), record(2).summary_view()],
        };
        let out = render(Format::Table, &list);
        assert!(out.contains("TIMESTAMP"));
        assert!(out.contains("apply failed"));
        assert!(out.contains("Q.."));
        assert!(out.contains("Total: 2 record(s)"));
    }

    #[test]
    fn record_list_json_is_array() {
        let list = RecordList {
            records: vec![record(1).summary_view()],
        };
        let value: Value = serde_json::from_str(&render(Format::Json, &list)).expect("json");
        assert_eq!(value[0]["id"], json!(1));
        assert_eq!(value[0]["level"], json!("ERROR"));
        assert!(value[0].get("raw_payload").is_none());
    }

    #[test]
    fn empty_list_table() {
        let out = render(Format::Table, &RecordList { records: Vec::new() });
        assert_eq!(out, "No records\n");
    }

    #[test]
    fn record_detail_shows_payload() {
        let out = render(Format::Table, &RecordDetail { record: record(4) });
        assert!(out.contains("Record 4"));
        assert!(out.contains("Correlation ID:  req-1"));
        assert!(out.contains("Request body:    yes"));
        assert!(out.contains("Payload"));
    }

    #[test]
    fn body_view_empty_side() {
        let view = BodyView {
            id: LogId(2),
            part: BodyPart::Res,
            body: None,
        };
        assert_eq!(render(Format::Table, &view), "Record 2 has no res body\n");

        let value: Value = serde_json::from_str(&render(Format::Json, &view)).expect("json");
        assert_eq!(value, json!({"id": 2, "part": "res", "body": null}));
    }

    #[test]
    fn import_report_json_flattens_summary() {
        let report = ImportReport {
            source: None,
            summary: ImportSummary {
                format: InputFormat::Ndjson,
                imported: 3,
                skipped: 1,
            },
        };
        let value: Value = serde_json::from_str(&render(Format::Json, &report)).expect("json");
        assert_eq!(value, json!({"format": "ndjson", "imported": 3, "skipped": 1}));
        assert!(render(Format::Table, &report).contains("Inserted 3 demo record(s)"));
    }

    #[test]
    fn timeline_table() {
        let timeline = Timeline {
            groups: vec![TimelineGroup {
                correlation_id: "abc".into(),
                start: "2024-01-01T00:00:00Z".into(),
                end: "2024-01-01T00:05:00Z".into(),
                count: 2,
            }],
        };
        let out = render(Format::Table, &timeline);
        assert!(out.contains("CORRELATION ID"));
        assert!(out.contains("Total: 1 group(s)"));
    }

    #[test]
    fn truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_multibyte() {
        assert_eq!(truncate("ééééééé", 5), "éé...");
        assert_eq!(truncate("ééé", 2), "éé");
    }
}
