//! File import: detect, normalize, commit.
//!
//! One file is one batch. Lines or elements that cannot be used are skipped
//! and counted; everything else is committed together or not at all.

use std::fs;
use std::path::Path;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::error::Result;
use crate::format::{self, InputFormat};
use crate::normalize::{self, NormalizedRecord};
use crate::store::SharedStore;

/// Outcome of importing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// How the input was read.
    pub format: InputFormat,
    /// Records committed.
    pub imported: usize,
    /// Lines or elements skipped as malformed.
    pub skipped: usize,
}

/// Imports files into a store.
#[derive(Debug, Clone)]
pub struct Importer {
    store: SharedStore,
}

impl Importer {
    /// Creates an importer writing to `store`.
    #[must_use]
    pub const fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Imports a raw upload.
    ///
    /// Empty or unreadable input imports nothing and is not an error.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the batch cannot be committed; nothing
    /// from the file is stored then.
    pub fn import_bytes(&self, bytes: &[u8]) -> Result<ImportSummary> {
        let detected = format::detect(bytes);
        let batch: Vec<NormalizedRecord> = detected
            .records
            .into_iter()
            .map(normalize::normalize)
            .collect();

        let ids = self.store.create_batch(batch)?;
        let summary = ImportSummary {
            format: detected.format,
            imported: ids.len(),
            skipped: detected.skipped,
        };
        info!(
            format = summary.format.as_str(),
            imported = summary.imported,
            skipped = summary.skipped,
            "import complete"
        );
        Ok(summary)
    }

    /// Reads and imports a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the batch cannot be
    /// committed.
    pub fn import_path(&self, path: &Path) -> Result<ImportSummary> {
        let bytes = fs::read(path)?;
        info!(path = %path.display(), bytes = bytes.len(), "importing file");
        self.import_bytes(&bytes)
    }

    /// Inserts the built-in demo records, one second apart from now.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the batch cannot be committed.
    pub fn seed_demo(&self) -> Result<ImportSummary> {
        let now = Utc::now();
        let batch: Vec<NormalizedRecord> = demo_records()
            .into_iter()
            .zip(0..)
            .map(|(mut record, offset)| {
                let ts = now + Duration::seconds(offset);
                record.insert(
                    "@timestamp".to_string(),
                    Value::String(ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                );
                normalize::normalize(record)
            })
            .collect();

        let ids = self.store.create_batch(batch)?;
        info!(inserted = ids.len(), "seeded demo records");
        Ok(ImportSummary {
            format: InputFormat::JsonArray,
            imported: ids.len(),
            skipped: 0,
        })
    }
}

fn demo_records() -> Vec<Map<String, Value>> {
    let samples = [
        json!({
            "level": "INFO",
            "summary": "GET /v1/users",
            "section": "apply",
            "tf_req_id": "demo-apply-1",
            "tf_http_req_body": {"method": "GET", "path": "/v1/users"},
            "tf_http_res_body": {"status": 200, "items": 3}
        }),
        json!({
            "level": "ERROR",
            "summary": "POST /v1/orders failed",
            "section": "apply",
            "tf_req_id": "demo-apply-1",
            "tf_http_req_body": {"method": "POST", "path": "/v1/orders", "body": {"sku": "ABC", "qty": 2}},
            "tf_http_res_body": {"status": 500, "error": "db timeout"}
        }),
        json!({
            "level": "DEBUG",
            "summary": "Provider X handshake",
            "section": "provider",
            "tf_http_req_body": {"hello": "provider"},
            "tf_http_res_body": {"ok": true}
        }),
        json!({
            "level": "INFO",
            "summary": "Plan summary: 2 to add, 0 to change, 0 to destroy",
            "section": "plan"
        }),
    ];

    samples
        .into_iter()
        .filter_map(|sample| match sample {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}
