//! Record storage with a synchronously maintained search index.
//!
//! This module provides:
//! - [`Store`] - records, bodies and the [`SearchIndex`] behind one lock,
//!   optionally backed by a [`Journal`]
//! - [`SharedStore`] - `Arc` handle shared between importers and readers
//!
//! A write holds the state lock across the journal append and the in-memory
//! apply, so readers see either all of a batch or none of it.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{LogError, Result};
use crate::index::SearchIndex;
use crate::journal::{Journal, JournalBackend, ReplayOp};
use crate::normalize::NormalizedRecord;
use crate::types::{Bodies, BodyBlob, BodyPart, LogId, LogRecord, LogSummary, NewRecord};

/// Shared handle to a store.
pub type SharedStore = Arc<Store>;

/// Everything guarded by the store lock.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) records: BTreeMap<LogId, LogRecord>,
    pub(crate) bodies: HashMap<LogId, BodyBlob>,
    pub(crate) index: SearchIndex,
    next_id: u64,
}

impl StoreState {
    fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            bodies: HashMap::new(),
            index: SearchIndex::new(),
            next_id: 1,
        }
    }

    /// Index built from scratch over the stored records.
    fn rebuilt_index(&self) -> SearchIndex {
        let mut index = SearchIndex::new();
        for record in self.records.values() {
            index.insert(
                record.id,
                &record.level,
                record.correlation_id.as_deref(),
                &record.summary,
                &record.raw_payload,
            );
        }
        index
    }

    fn apply_insert(&mut self, record: LogRecord, body: Option<BodyBlob>) {
        let id = record.id;
        self.index.insert(
            id,
            &record.level,
            record.correlation_id.as_deref(),
            &record.summary,
            &record.raw_payload,
        );
        if let Some(body) = body {
            self.bodies.insert(id, body);
        }
        self.records.insert(id, record);
        self.next_id = self.next_id.max(id.0 + 1);
    }

    fn apply_replay(&mut self, ops: Vec<ReplayOp>) {
        for op in ops {
            match op {
                ReplayOp::Batch(rows) => {
                    for (record, body) in rows {
                        self.apply_insert(record, body);
                    }
                }
                ReplayOp::MarkRead(id) => match self.records.get_mut(&id) {
                    Some(record) => record.is_read = true,
                    None => warn!(%id, "journal marks unknown record as read, ignoring"),
                },
            }
        }
    }
}

/// Thread-safe record store.
pub struct Store {
    state: RwLock<StoreState>,
    /// Locked only while `state` is write-locked.
    journal: Mutex<Option<Journal>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("records", &self.len())
            .field("journaled", &self.journal.lock().is_some())
            .finish()
    }
}

impl Store {
    /// Opens a journal-backed store, replaying everything committed so far.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Locked`] while another store has the same journal
    /// open. Also fails if the configuration is invalid, the data directory
    /// cannot be created, or the journal is corrupt.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let path = config.journal_path();
        let (journal, ops) = Journal::open(&path, config.sync_on_commit)?;

        let mut state = StoreState::new();
        state.apply_replay(ops);
        info!(
            path = %path.display(),
            records = state.records.len(),
            bodies = state.bodies.len(),
            "opened log store"
        );

        Ok(Self {
            state: RwLock::new(state),
            journal: Mutex::new(Some(journal)),
        })
    }

    /// Creates a store that keeps everything in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(StoreState::new()),
            journal: Mutex::new(None),
        }
    }

    /// Creates an empty store writing to a custom journal backend.
    #[must_use]
    pub fn with_backend(backend: Box<dyn JournalBackend>, sync_on_commit: bool) -> Self {
        Self {
            state: RwLock::new(StoreState::new()),
            journal: Mutex::new(Some(Journal::new(backend, sync_on_commit))),
        }
    }

    /// Wraps the store in a shared handle.
    #[must_use]
    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }

    /// Stores one record and its bodies.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal write fails; nothing is stored then.
    pub fn create(&self, record: NewRecord, bodies: Bodies) -> Result<LogId> {
        let ids = self.create_batch(vec![NormalizedRecord { record, bodies }])?;
        ids.first()
            .copied()
            .ok_or_else(|| LogError::Io(std::io::Error::other("batch returned no identity")))
    }

    /// Stores an ordered batch as one unit.
    ///
    /// Identities are assigned in batch order. Either every record becomes
    /// visible or, on error, none does.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal write fails.
    pub fn create_batch(&self, batch: Vec<NormalizedRecord>) -> Result<Vec<LogId>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.write();
        let first = state.next_id;
        let rows: Vec<(LogRecord, Option<BodyBlob>)> = (first..)
            .zip(batch)
            .map(|(id, normalized)| {
                let record = LogRecord::from_new(LogId(id), normalized.record, &normalized.bodies);
                (record, normalized.bodies.into_blob())
            })
            .collect();

        if let Some(journal) = self.journal.lock().as_mut() {
            let refs: Vec<(&LogRecord, Option<&BodyBlob>)> =
                rows.iter().map(|(record, body)| (record, body.as_ref())).collect();
            journal.commit_batch(&refs)?;
        }

        let ids: Vec<LogId> = rows.iter().map(|(record, _)| record.id).collect();
        for (record, body) in rows {
            state.apply_insert(record, body);
        }
        drop(state);

        debug!(count = ids.len(), first_id = first, "committed record batch");
        Ok(ids)
    }

    /// Sets the read marker on a record. Already-read records are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::NotFound`] for an unknown id, or a journal error.
    pub fn mark_read(&self, id: LogId) -> Result<()> {
        let mut state = self.state.write();
        let record = state.records.get_mut(&id).ok_or(LogError::NotFound(id.0))?;
        if record.is_read {
            return Ok(());
        }

        if let Some(journal) = self.journal.lock().as_mut() {
            journal.mark_read(id)?;
        }
        record.is_read = true;
        Ok(())
    }

    /// Returns the full record.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::NotFound`] if no record has this id.
    pub fn get(&self, id: LogId) -> Result<LogRecord> {
        self.state
            .read()
            .records
            .get(&id)
            .cloned()
            .ok_or(LogError::NotFound(id.0))
    }

    /// Returns one side of a record's bodies.
    ///
    /// `Ok(None)` means the body row exists but this side is empty.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::BodyNotFound`] if the record has no body row.
    pub fn get_body(&self, id: LogId, part: BodyPart) -> Result<Option<Value>> {
        let state = self.state.read();
        let blob = state.bodies.get(&id).ok_or(LogError::BodyNotFound(id.0))?;
        Ok(blob.part(part).cloned())
    }

    /// Returns summaries by ascending id.
    #[must_use]
    pub fn list(&self, limit: usize, offset: usize) -> Vec<LogSummary> {
        self.state
            .read()
            .records
            .values()
            .skip(offset)
            .take(limit)
            .map(LogRecord::summary_view)
            .collect()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that the live index equals one rebuilt from the stored
    /// records (entries, postings and lookup tables alike), that every body
    /// row belongs to a record, and that body flags match stored bodies.
    #[must_use]
    pub fn index_is_consistent(&self) -> bool {
        let state = self.state.read();
        if state.index != state.rebuilt_index() {
            return false;
        }
        if !state.bodies.keys().all(|id| state.records.contains_key(id)) {
            return false;
        }
        state.records.values().all(|record| {
            let body = state.bodies.get(&record.id);
            let req = body.and_then(|b| b.part(BodyPart::Req)).is_some();
            let res = body.and_then(|b| b.part(BodyPart::Res)).is_some();
            req == record.has_req_body && res == record.has_res_body
        })
    }

    /// Runs `f` against a consistent snapshot of the state.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.state.read())
    }
}
