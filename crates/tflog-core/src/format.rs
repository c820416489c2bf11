//! Input format detection.
//!
//! Uploaded files are either a JSON array of objects (optionally wrapped as
//! `{"records": [...]}`) or newline-delimited JSON. Detection never rejects
//! a file: anything that is not recognisably an array is read line by line,
//! and elements that cannot be used are skipped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Key unwrapped when a file is an object holding the record list.
const RECORDS_KEY: &str = "records";

/// How a buffer was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// A single JSON document holding a list of records.
    JsonArray,
    /// One JSON object per line.
    Ndjson,
}

impl InputFormat {
    /// Returns the format name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::JsonArray => "json_array",
            Self::Ndjson => "ndjson",
        }
    }
}

/// Candidate records extracted from a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedInput {
    /// The mode that was selected.
    pub format: InputFormat,
    /// Record objects in input order.
    pub records: Vec<Map<String, Value>>,
    /// Elements or lines that were not usable objects.
    pub skipped: usize,
}

impl DetectedInput {
    const fn empty(format: InputFormat) -> Self {
        Self {
            format,
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// Decodes UTF-8, dropping invalid byte sequences instead of replacing them.
#[must_use]
pub fn decode_lossy(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                // valid_up_to guarantees this prefix is well-formed
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match err.error_len() {
                    Some(len) => bytes = &rest[len..],
                    None => return out,
                }
            }
        }
    }
}

/// Detects the format of a raw upload and extracts its record objects.
#[must_use]
pub fn detect(bytes: &[u8]) -> DetectedInput {
    let text = decode_lossy(bytes);
    detect_text(text.trim())
}

/// Detects the format of already-decoded text.
#[must_use]
pub fn detect_text(text: &str) -> DetectedInput {
    let text = text.trim();
    match text.chars().next() {
        None => DetectedInput::empty(InputFormat::Ndjson),
        Some('[') => parse_array_document(text),
        Some('{') => match needs_document_parse(text).then(|| wrapped_records(text)).flatten() {
            Some(items) => collect_objects(InputFormat::JsonArray, items),
            None => parse_lines(text),
        },
        Some(_) => parse_lines(text),
    }
}

fn parse_array_document(text: &str) -> DetectedInput {
    let document = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "array document is not valid JSON, nothing to import");
            return DetectedInput::empty(InputFormat::JsonArray);
        }
    };

    let document = match document {
        Value::Object(mut map) if map.contains_key(RECORDS_KEY) => {
            map.remove(RECORDS_KEY).unwrap_or(Value::Null)
        }
        other => other,
    };

    match document {
        Value::Array(items) => collect_objects(InputFormat::JsonArray, items),
        _ => DetectedInput::empty(InputFormat::JsonArray),
    }
}

/// Returns false when the first line is a complete object of its own and
/// more lines follow, i.e. the text can only be newline-delimited.
///
/// Keeps large NDJSON uploads from being parsed twice.
fn needs_document_parse(text: &str) -> bool {
    match text.split_once('\n') {
        None => true,
        Some((first, _)) => serde_json::from_str::<Value>(first.trim()).is_err(),
    }
}

/// Returns the record list when the whole text is `{"records": [...]}`.
fn wrapped_records(text: &str) -> Option<Vec<Value>> {
    let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(text) else {
        return None;
    };
    match map.remove(RECORDS_KEY) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn collect_objects(format: InputFormat, items: Vec<Value>) -> DetectedInput {
    let mut detected = DetectedInput::empty(format);
    for (position, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(map) => detected.records.push(map),
            _ => {
                debug!(position, "skipping non-object array element");
                detected.skipped += 1;
            }
        }
    }
    detected
}

fn parse_lines(text: &str) -> DetectedInput {
    let mut detected = DetectedInput::empty(InputFormat::Ndjson);
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => detected.records.push(map),
            Ok(_) => {
                debug!(line = index + 1, "skipping non-object line");
                detected.skipped += 1;
            }
            Err(err) => {
                debug!(line = index + 1, error = %err, "skipping malformed line");
                detected.skipped += 1;
            }
        }
    }
    detected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_mode_keeps_only_objects() {
        let detected = detect(br#"[{"a":1}, 2, "x", {"b":2}, null]"#);
        assert_eq!(detected.format, InputFormat::JsonArray);
        assert_eq!(detected.records.len(), 2);
        assert_eq!(detected.skipped, 3);
    }

    #[test]
    fn leading_whitespace_is_ignored() {
        let detected = detect(b"\n\n   [ {\"a\": 1} ]\n");
        assert_eq!(detected.format, InputFormat::JsonArray);
        assert_eq!(detected.records.len(), 1);
    }

    #[test]
    fn wrapped_records_object_is_unwrapped() {
        let detected = detect(br#"{"records": [{"msg": "one"}, {"msg": "two"}]}"#);
        assert_eq!(detected.format, InputFormat::JsonArray);
        assert_eq!(detected.records.len(), 2);
        assert_eq!(detected.records[1].get("msg"), Some(&Value::from("two")));
    }

    #[test]
    fn multi_line_wrapped_records_are_unwrapped() {
        let text = "{\n  \"records\": [\n    {\"msg\": \"one\"}\n  ]\n}\n";
        let detected = detect(text.as_bytes());
        assert_eq!(detected.format, InputFormat::JsonArray);
        assert_eq!(detected.records.len(), 1);
    }

    #[test]
    fn single_object_without_records_list_is_one_line() {
        let detected = detect(br#"{"records": 3, "msg": "hello"}"#);
        assert_eq!(detected.format, InputFormat::Ndjson);
        assert_eq!(detected.records.len(), 1);
    }

    #[test]
    fn document_parse_only_when_first_line_is_incomplete() {
        assert!(needs_document_parse(r#"{"records": [{"msg": "one"}]}"#));
        assert!(needs_document_parse("{\n  \"records\": []\n}"));
        assert!(!needs_document_parse("{\"msg\":\"a\"}\n{\"msg\":\"b\"}"));
        assert!(!needs_document_parse("{\"msg\":\"a\"}\r\n{\"msg\":\"b\"}"));
    }

    #[test]
    fn records_object_on_first_of_many_lines_is_one_record() {
        let text = "{\"records\": [{\"msg\": \"inner\"}]}\n{\"msg\": \"next\"}\n";
        let detected = detect(text.as_bytes());
        assert_eq!(detected.format, InputFormat::Ndjson);
        assert_eq!(detected.records.len(), 2);
        assert!(detected.records[0].contains_key("records"));
    }

    #[test]
    fn broken_array_yields_nothing() {
        let detected = detect(br#"[{"a":1}, {"b":"#);
        assert_eq!(detected.format, InputFormat::JsonArray);
        assert!(detected.records.is_empty());
    }

    #[test]
    fn ndjson_skips_blank_and_malformed_lines() {
        let text = "{\"a\":1}\n\n   \nnot json\n[1,2]\n{\"b\":2}\r\n{\"c\":\n";
        let detected = detect(text.as_bytes());
        assert_eq!(detected.format, InputFormat::Ndjson);
        assert_eq!(detected.records.len(), 2);
        // "not json", "[1,2]" and the truncated object
        assert_eq!(detected.skipped, 3);
    }

    #[test]
    fn empty_input_is_empty_ndjson() {
        let detected = detect(b"   \n\t ");
        assert_eq!(detected.format, InputFormat::Ndjson);
        assert!(detected.records.is_empty());
        assert_eq!(detected.skipped, 0);
    }

    #[test]
    fn invalid_utf8_is_dropped() {
        assert_eq!(decode_lossy(b"ab\xffcd\xc3"), "abcd");
        assert_eq!(decode_lossy("héllo".as_bytes()), "héllo");

        let mut bytes = b"{\"msg\":\"ok".to_vec();
        bytes.push(0xfe);
        bytes.extend_from_slice(b"\"}");
        let detected = detect(&bytes);
        assert_eq!(detected.records.len(), 1);
        assert_eq!(detected.records[0].get("msg"), Some(&Value::from("ok")));
    }
}
