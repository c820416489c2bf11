//! Read-side queries over a [`Store`](crate::store::Store).
//!
//! Every query validates its parameters before touching the store, then
//! works on one snapshot taken under the store's read lock.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LogError, Result};
use crate::index::TextQuery;
use crate::store::{SharedStore, StoreState};
use crate::types::{ExportRow, LogId, LogRecord, LogSummary, TimelineGroup};

/// Default page size for search.
pub const SEARCH_DEFAULT_LIMIT: usize = 100;
/// Largest page size for search.
pub const SEARCH_MAX_LIMIT: usize = 1000;
/// Default page size for list.
pub const LIST_DEFAULT_LIMIT: usize = 50;
/// Largest page size for list.
pub const LIST_MAX_LIMIT: usize = 500;

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of rows.
    pub limit: usize,
    /// Rows skipped before the first returned one.
    pub offset: usize,
}

impl Pagination {
    /// Validates raw paging parameters against a default and a maximum.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidQuery`] if `limit` is outside `1..=max` or
    /// `offset` is negative.
    pub fn new(limit: Option<i64>, offset: Option<i64>, default: usize, max: usize) -> Result<Self> {
        let limit = match limit {
            None => default,
            Some(limit) => usize::try_from(limit)
                .ok()
                .filter(|limit| (1..=max).contains(limit))
                .ok_or_else(|| {
                    LogError::invalid_query(format!("limit must be between 1 and {max}, got {limit}"))
                })?,
        };
        let offset = match offset {
            None => 0,
            Some(offset) => usize::try_from(offset).map_err(|_| {
                LogError::invalid_query(format!("offset must be non-negative, got {offset}"))
            })?,
        };
        Ok(Self { limit, offset })
    }

    /// Search paging: limit 1..=1000, default 100.
    ///
    /// # Errors
    ///
    /// See [`Pagination::new`].
    pub fn for_search(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        Self::new(limit, offset, SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT)
    }

    /// List paging: limit 1..=500, default 50.
    ///
    /// # Errors
    ///
    /// See [`Pagination::new`].
    pub fn for_list(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        Self::new(limit, offset, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT)
    }
}

/// Search parameters. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Full-text query.
    pub q: Option<String>,
    /// Exact level.
    pub level: Option<String>,
    /// Exact correlation id.
    pub correlation_id: Option<String>,
    /// Inclusive lower timestamp bound.
    pub from_ts: Option<String>,
    /// Inclusive upper timestamp bound.
    pub to_ts: Option<String>,
    /// Page size.
    pub limit: Option<i64>,
    /// Page start.
    pub offset: Option<i64>,
}

impl SearchParams {
    /// Creates empty parameters (match everything, default paging).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the text query.
    #[must_use]
    pub fn with_text(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Sets the level filter.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Sets the correlation id filter.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Sets the inclusive timestamp range. Either bound may be open.
    #[must_use]
    pub fn with_range(mut self, from_ts: Option<String>, to_ts: Option<String>) -> Self {
        self.from_ts = from_ts;
        self.to_ts = to_ts;
        self
    }

    /// Sets paging.
    #[must_use]
    pub const fn with_page(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Filters after validation.
struct SearchFilter<'a> {
    text: Option<TextQuery>,
    level: Option<&'a str>,
    correlation_id: Option<&'a str>,
    from_ts: Option<&'a str>,
    to_ts: Option<&'a str>,
}

impl<'a> SearchFilter<'a> {
    fn from_params(params: &'a SearchParams) -> Result<Self> {
        let text = match params.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => Some(TextQuery::parse(q)?),
            _ => None,
        };
        Ok(Self {
            text,
            level: present(params.level.as_ref()),
            correlation_id: present(params.correlation_id.as_ref()),
            from_ts: present(params.from_ts.as_ref()),
            to_ts: present(params.to_ts.as_ref()),
        })
    }

    /// Narrows the candidate set through the index, `None` meaning all.
    fn candidates(&self, state: &StoreState) -> Option<HashSet<LogId>> {
        let mut sets: Vec<HashSet<LogId>> = Vec::new();
        if let Some(text) = &self.text {
            sets.push(state.index.search(text));
        }
        if let Some(level) = self.level {
            sets.push(state.index.by_level(level).iter().copied().collect());
        }
        if let Some(correlation_id) = self.correlation_id {
            sets.push(state.index.by_correlation(correlation_id).iter().copied().collect());
        }

        sets.into_iter()
            .reduce(|acc, set| acc.intersection(&set).copied().collect())
    }

    fn in_range(&self, record: &LogRecord) -> bool {
        let ts = record.ts.as_str();
        self.from_ts.is_none_or(|from| from <= ts) && self.to_ts.is_none_or(|to| ts <= to)
    }
}

/// Query layer over a shared store.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: SharedStore,
}

impl QueryEngine {
    /// Creates an engine reading from `store`.
    #[must_use]
    pub const fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Filters, matches and pages records, ordered by timestamp then id.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidQuery`] for bad paging or a text query
    /// without searchable terms.
    pub fn search(&self, params: &SearchParams) -> Result<Vec<LogSummary>> {
        let page = Pagination::for_search(params.limit, params.offset)?;
        let filter = SearchFilter::from_params(params)?;

        let results = self.store.with_state(|state| {
            let mut hits: Vec<&LogRecord> = match filter.candidates(state) {
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| state.records.get(id))
                    .filter(|record| filter.in_range(record))
                    .collect(),
                None => state
                    .records
                    .values()
                    .filter(|record| filter.in_range(record))
                    .collect(),
            };
            hits.sort_by(|a, b| a.ts.cmp(&b.ts).then(a.id.cmp(&b.id)));

            hits.into_iter()
                .skip(page.offset)
                .take(page.limit)
                .map(LogRecord::summary_view)
                .collect::<Vec<_>>()
        });

        debug!(results = results.len(), limit = page.limit, offset = page.offset, "search complete");
        Ok(results)
    }

    /// Pages all records by ascending id.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidQuery`] for bad paging.
    pub fn list(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<LogSummary>> {
        let page = Pagination::for_list(limit, offset)?;
        Ok(self.store.list(page.limit, page.offset))
    }

    /// Groups records by correlation id.
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineGroup> {
        let mut groups: Vec<TimelineGroup> = self.store.with_state(|state| {
            let mut by_id: BTreeMap<&str, TimelineGroup> = BTreeMap::new();
            for record in state.records.values() {
                let Some(correlation_id) = record.correlation_id.as_deref() else {
                    continue;
                };
                by_id
                    .entry(correlation_id)
                    .and_modify(|group| {
                        if record.ts < group.start {
                            group.start.clone_from(&record.ts);
                        }
                        if record.ts > group.end {
                            group.end.clone_from(&record.ts);
                        }
                        group.count += 1;
                    })
                    .or_insert_with(|| TimelineGroup {
                        correlation_id: correlation_id.to_string(),
                        start: record.ts.clone(),
                        end: record.ts.clone(),
                        count: 1,
                    });
            }
            by_id.into_values().collect()
        });

        groups.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.correlation_id.cmp(&b.correlation_id))
        });
        groups
    }

    /// Writes every record as one NDJSON line, by ascending id.
    ///
    /// Rows are copied out under the read lock and written after it is
    /// released.
    ///
    /// # Errors
    ///
    /// Returns a serialization or I/O error from the writer.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<usize> {
        let rows: Vec<ExportRow> = self
            .store
            .with_state(|state| state.records.values().map(LogRecord::export_row).collect());

        for row in &rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(rows.len())
    }
}
