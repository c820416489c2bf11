//! Core record types.
//!
//! This module provides:
//! - [`LogId`] - Monotonically assigned record identity
//! - [`LogRecord`] - Normalized record as persisted, including the raw payload
//! - [`LogSummary`] - Lightweight projection used by list and search
//! - [`NewRecord`] / [`Bodies`] - Normalizer output awaiting an identity
//! - [`BodyBlob`] / [`BodyPart`] - Request/response payloads owned by a record
//! - [`TimelineGroup`] / [`ExportRow`] - Query results

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LogError;

/// Unique identifier for a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogId(pub u64);

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized log record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Identity assigned at creation.
    pub id: LogId,
    /// Opaque timestamp string, compared lexicographically.
    pub ts: String,
    /// Canonical uppercase level.
    pub level: String,
    /// Optional phase tag (`plan_start`, `apply_end`, ...).
    pub section: Option<String>,
    /// Optional correlation id used for timeline grouping.
    pub correlation_id: Option<String>,
    /// Single-line summary, at most 150 characters.
    pub summary: String,
    /// Whether a non-null request body is stored.
    pub has_req_body: bool,
    /// Whether a non-null response body is stored.
    pub has_res_body: bool,
    /// Read marker, the only field that changes after creation.
    #[serde(default)]
    pub is_read: bool,
    /// Sanitized original record serialized as JSON text.
    pub raw_payload: String,
}

impl LogRecord {
    /// Builds the persisted form of a normalized record.
    #[must_use]
    pub fn from_new(id: LogId, record: NewRecord, bodies: &Bodies) -> Self {
        Self {
            id,
            ts: record.ts,
            level: record.level,
            section: record.section,
            correlation_id: record.correlation_id,
            summary: record.summary,
            has_req_body: bodies.request.is_some(),
            has_res_body: bodies.response.is_some(),
            is_read: false,
            raw_payload: record.raw_payload,
        }
    }

    /// Returns the lightweight projection of this record.
    #[must_use]
    pub fn summary_view(&self) -> LogSummary {
        LogSummary {
            id: self.id,
            ts: self.ts.clone(),
            level: self.level.clone(),
            section: self.section.clone(),
            correlation_id: self.correlation_id.clone(),
            summary: self.summary.clone(),
            has_req_body: self.has_req_body,
            has_res_body: self.has_res_body,
            is_read: self.is_read,
        }
    }

    /// Returns the export projection of this record.
    #[must_use]
    pub fn export_row(&self) -> ExportRow {
        ExportRow {
            id: self.id,
            ts: self.ts.clone(),
            level: self.level.clone(),
            section: self.section.clone(),
            correlation_id: self.correlation_id.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Record fields without the raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    /// Record identity.
    pub id: LogId,
    /// Opaque timestamp string.
    pub ts: String,
    /// Canonical uppercase level.
    pub level: String,
    /// Optional phase tag.
    pub section: Option<String>,
    /// Optional correlation id.
    pub correlation_id: Option<String>,
    /// Single-line summary.
    pub summary: String,
    /// Whether a request body is stored.
    pub has_req_body: bool,
    /// Whether a response body is stored.
    pub has_res_body: bool,
    /// Read marker.
    pub is_read: bool,
}

/// A normalized record that has not been assigned an identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Opaque timestamp string.
    pub ts: String,
    /// Canonical uppercase level.
    pub level: String,
    /// Optional phase tag.
    pub section: Option<String>,
    /// Optional correlation id.
    pub correlation_id: Option<String>,
    /// Single-line summary.
    pub summary: String,
    /// Sanitized JSON text of the original record.
    pub raw_payload: String,
}

impl NewRecord {
    /// Creates a record with the required fields and an empty JSON payload.
    #[must_use]
    pub fn new(ts: impl Into<String>, level: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            ts: ts.into(),
            level: level.into(),
            section: None,
            correlation_id: None,
            summary: summary.into(),
            raw_payload: "{}".to_string(),
        }
    }

    /// Sets the section tag.
    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Sets the raw payload text.
    #[must_use]
    pub fn with_raw_payload(mut self, raw: impl Into<String>) -> Self {
        self.raw_payload = raw.into();
        self
    }
}

/// Request/response payloads extracted from a record, `None` meaning null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bodies {
    /// Request payload.
    pub request: Option<Value>,
    /// Response payload.
    pub response: Option<Value>,
}

impl Bodies {
    /// Creates a pair of bodies, folding JSON `null` into `None`.
    #[must_use]
    pub fn new(request: Option<Value>, response: Option<Value>) -> Self {
        Self {
            request: request.filter(|v| !v.is_null()),
            response: response.filter(|v| !v.is_null()),
        }
    }

    /// Returns true when neither side carries a payload.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.request.is_none() && self.response.is_none()
    }

    /// Converts into a stored blob, or `None` when there is nothing to store.
    #[must_use]
    pub fn into_blob(self) -> Option<BodyBlob> {
        if self.is_empty() {
            return None;
        }
        Some(BodyBlob {
            request: self.request,
            response: self.response,
        })
    }
}

/// Stored request/response payloads, 1:1 with a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyBlob {
    /// Request payload, if any.
    pub request: Option<Value>,
    /// Response payload, if any.
    pub response: Option<Value>,
}

impl BodyBlob {
    /// Returns the requested side.
    #[must_use]
    pub const fn part(&self, part: BodyPart) -> Option<&Value> {
        match part {
            BodyPart::Req => self.request.as_ref(),
            BodyPart::Res => self.response.as_ref(),
        }
    }
}

/// Body side selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPart {
    /// Request body.
    Req,
    /// Response body.
    Res,
}

impl BodyPart {
    /// Returns the selector string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Req => "req",
            Self::Res => "res",
        }
    }
}

impl FromStr for BodyPart {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "req" => Ok(Self::Req),
            "res" => Ok(Self::Res),
            other => Err(LogError::invalid_query(format!(
                "body part must be 'req' or 'res', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate of all records sharing a correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineGroup {
    /// The shared correlation id.
    pub correlation_id: String,
    /// Smallest timestamp in the group.
    pub start: String,
    /// Largest timestamp in the group.
    pub end: String,
    /// Number of records in the group.
    pub count: usize,
}

/// One line of the NDJSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    /// Record identity.
    pub id: LogId,
    /// Opaque timestamp string.
    pub ts: String,
    /// Canonical uppercase level.
    pub level: String,
    /// Optional phase tag.
    pub section: Option<String>,
    /// Optional correlation id.
    pub correlation_id: Option<String>,
    /// Single-line summary.
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_record() -> LogRecord {
        let bodies = Bodies::new(Some(json!({"method": "GET"})), None);
        LogRecord::from_new(
            LogId(3),
            NewRecord::new("2024-01-01T00:00:00Z", "INFO", "GET /v1/users")
                .with_section("apply_start")
                .with_correlation_id("req-1"),
            &bodies,
        )
    }

    #[test]
    fn from_new_derives_body_flags() {
        let record = make_record();
        assert_eq!(record.id, LogId(3));
        assert!(record.has_req_body);
        assert!(!record.has_res_body);
        assert!(!record.is_read);
        assert_eq!(record.raw_payload, "{}");
    }

    #[test]
    fn bodies_fold_null_into_none() {
        let bodies = Bodies::new(Some(Value::Null), Some(json!("ok")));
        assert_eq!(bodies.request, None);
        assert_eq!(bodies.response, Some(json!("ok")));
        assert!(!bodies.is_empty());

        assert!(Bodies::new(Some(Value::Null), None).into_blob().is_none());
    }

    #[test]
    fn blob_part_selects_side() {
        let blob = Bodies::new(None, Some(json!({"status": 200})))
            .into_blob()
            .expect("response side is present");
        assert_eq!(blob.part(BodyPart::Req), None);
        assert_eq!(blob.part(BodyPart::Res), Some(&json!({"status": 200})));
    }

    #[test]
    fn body_part_parsing() {
        assert_eq!("req".parse::<BodyPart>().ok(), Some(BodyPart::Req));
        assert_eq!("res".parse::<BodyPart>().ok(), Some(BodyPart::Res));

        let err = "both".parse::<BodyPart>();
        assert!(matches!(err, Err(LogError::InvalidQuery(_))));
        assert_eq!(BodyPart::Res.to_string(), "res");
    }

    #[test]
    fn summary_view_drops_payload() {
        let record = make_record();
        let view = record.summary_view();
        assert_eq!(view.id, record.id);
        assert_eq!(view.summary, "GET /v1/users");
        let json = serde_json::to_string(&view).unwrap_or_default();
        assert!(!json.contains("raw_payload"));
    }

    #[test]
    fn export_row_serialization() {
        let row = make_record().export_row();
        let json = serde_json::to_value(&row).unwrap_or(Value::Null);
        assert_eq!(
            json,
            json!({
                "id": 3,
                "ts": "2024-01-01T00:00:00Z",
                "level": "INFO",
                "section": "apply_start",
                "correlation_id": "req-1",
                "summary": "GET /v1/users"
            })
        );
    }

    #[test]
    fn log_record_roundtrips_through_json() {
        let record = make_record();
        let json = serde_json::to_string(&record).unwrap_or_default();
        let back: Result<LogRecord, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(record));
    }
}
