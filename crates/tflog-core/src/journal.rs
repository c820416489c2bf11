//! Append-only JSON-lines journal.
//!
//! Every import is written as a run of `insert` lines closed by one `commit`
//! line; read marks are single `mark_read` lines. On open, inserts without a
//! closing commit (a crash mid-batch) and a torn final line are discarded and
//! truncated away. A write failure truncates the file back to where the
//! batch started, so a failed batch leaves no trace.
//!
//! A file journal has one writer at a time: [`Journal::open`] claims a
//! `<journal>.lock` file next to it and fails with [`LogError::Locked`] while
//! another handle holds it. The claim ends when the journal is dropped.
//!
//! ```text
//! {"op":"insert","record":{...},"body":{...}}
//! {"op":"insert","record":{...}}
//! {"op":"commit","count":2}
//! {"op":"mark_read","id":1}
//! ```

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LogError, Result};
use crate::types::{BodyBlob, LogId, LogRecord};

/// One line of the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalEntry {
    /// A record (and its body row, if any) belonging to the open batch.
    Insert {
        /// The record.
        record: LogRecord,
        /// Its body row.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<BodyBlob>,
    },
    /// Closes a batch of `count` inserts.
    Commit {
        /// Number of inserts in the batch.
        count: usize,
    },
    /// Sets the read marker of a record.
    MarkRead {
        /// The record.
        id: LogId,
    },
}

/// A record together with its optional body row.
pub type StoredRow = (LogRecord, Option<BodyBlob>);

/// A committed operation recovered from the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOp {
    /// A committed batch, in write order.
    Batch(Vec<StoredRow>),
    /// A read marker.
    MarkRead(LogId),
}

/// Storage underneath a [`Journal`].
///
/// Implemented by [`FileBackend`]; other implementations let tests inject
/// write failures.
pub trait JournalBackend: Send {
    /// Current length in bytes.
    fn byte_len(&mut self) -> Result<u64>;

    /// Appends bytes at the end.
    fn append(&mut self, bytes: &[u8]) -> Result<()>;

    /// Makes appended bytes durable.
    fn sync(&mut self) -> Result<()>;

    /// Cuts the journal back to `len` bytes.
    fn truncate(&mut self, len: u64) -> Result<()>;
}

/// Journal stored in a local file.
pub struct FileBackend {
    path: PathBuf,
    file: File,
}

impl FileBackend {
    /// Opens (creating if needed) the file for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self { path, file })
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JournalBackend for FileBackend {
    fn byte_len(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        Ok(())
    }
}

/// Exclusive claim on a journal file, removed on drop.
#[derive(Debug)]
pub struct JournalLock {
    path: PathBuf,
}

impl JournalLock {
    /// Creates `<journal>.lock`, recording this process id in it.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Locked`] if the lock file already exists, or an
    /// I/O error.
    pub fn acquire(journal: &Path) -> Result<Self> {
        let path = lock_path(journal);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .map(|pid| pid.trim().to_string())
                    .ok()
                    .filter(|pid| !pid.is_empty())
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(LogError::Locked { path, holder });
            }
            Err(err) => return Err(err.into()),
        };

        // from here on a failure still removes the file
        let lock = Self { path };
        writeln!(file, "{}", std::process::id())?;
        file.sync_data()?;
        debug!(path = %lock.path.display(), "journal lock acquired");
        Ok(lock)
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JournalLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove journal lock");
        }
    }
}

/// `records.jsonl` -> `records.jsonl.lock`.
fn lock_path(journal: &Path) -> PathBuf {
    let mut name = OsString::from(journal.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Batch-oriented writer over a [`JournalBackend`].
pub struct Journal {
    backend: Box<dyn JournalBackend>,
    sync_on_commit: bool,
    /// Held for the journal's lifetime; `None` for custom backends.
    lock: Option<JournalLock>,
}

impl Journal {
    /// Wraps a backend.
    #[must_use]
    pub fn new(backend: Box<dyn JournalBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend,
            sync_on_commit,
            lock: None,
        }
    }

    /// Returns the lock file held by this journal, if any.
    #[must_use]
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock.as_ref().map(JournalLock::path)
    }

    /// Opens a file journal, returning it with every committed operation.
    ///
    /// The lock is taken before anything is read. An uncommitted or torn
    /// tail is truncated away before the journal is reopened for appending.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Locked`] if another handle has the journal open,
    /// [`LogError::Corrupt`] if a line before the last commit cannot be
    /// decoded, or an I/O error.
    pub fn open(path: &Path, sync_on_commit: bool) -> Result<(Self, Vec<ReplayOp>)> {
        let lock = JournalLock::acquire(path)?;
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let replay = replay(&bytes)?;
        let mut backend = FileBackend::open(path)?;

        if replay.valid_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                discarded_bytes = bytes.len() as u64 - replay.valid_len,
                discarded_inserts = replay.discarded_inserts,
                "discarding uncommitted journal tail"
            );
            backend.truncate(replay.valid_len)?;
            backend.sync()?;
        }

        let mut journal = Self::new(Box::new(backend), sync_on_commit);
        journal.lock = Some(lock);
        Ok((journal, replay.ops))
    }

    /// Writes a batch and its commit marker.
    ///
    /// On failure the journal is truncated back to its length before the
    /// call.
    ///
    /// # Errors
    ///
    /// Returns the first serialization or I/O error.
    pub fn commit_batch(&mut self, rows: &[(&LogRecord, Option<&BodyBlob>)]) -> Result<()> {
        let start = self.backend.byte_len()?;
        let result = self.write_batch(rows);
        if result.is_err() {
            if let Err(rollback_err) = self.backend.truncate(start) {
                warn!(error = %rollback_err, offset = start, "failed to roll back journal batch");
            }
        }
        result
    }

    /// Writes a read marker.
    ///
    /// # Errors
    ///
    /// Returns a serialization or I/O error.
    pub fn mark_read(&mut self, id: LogId) -> Result<()> {
        let start = self.backend.byte_len()?;
        let result = self.write_entries(&[JournalEntry::MarkRead { id }]);
        if result.is_err() {
            if let Err(rollback_err) = self.backend.truncate(start) {
                warn!(error = %rollback_err, offset = start, "failed to roll back read marker");
            }
        }
        result
    }

    fn write_batch(&mut self, rows: &[(&LogRecord, Option<&BodyBlob>)]) -> Result<()> {
        let mut buf = Vec::new();
        for (record, body) in rows {
            encode_line(
                &mut buf,
                &JournalEntry::Insert {
                    record: (*record).clone(),
                    body: body.cloned(),
                },
            )?;
        }
        self.backend.append(&buf)?;
        debug!(rows = rows.len(), bytes = buf.len(), "journal batch written");

        self.write_entries(&[JournalEntry::Commit { count: rows.len() }])
    }

    fn write_entries(&mut self, entries: &[JournalEntry]) -> Result<()> {
        let mut buf = Vec::new();
        for entry in entries {
            encode_line(&mut buf, entry)?;
        }
        self.backend.append(&buf)?;
        if self.sync_on_commit {
            self.backend.sync()?;
        }
        Ok(())
    }
}

fn encode_line(buf: &mut Vec<u8>, entry: &JournalEntry) -> Result<()> {
    serde_json::to_writer(&mut *buf, entry)?;
    buf.push(b'\n');
    Ok(())
}

/// Result of scanning journal bytes.
#[derive(Debug, Default)]
struct Replay {
    ops: Vec<ReplayOp>,
    /// Byte offset just past the last committed line.
    valid_len: u64,
    discarded_inserts: usize,
}

fn replay(bytes: &[u8]) -> Result<Replay> {
    let mut replay = Replay::default();
    let mut pending: Vec<StoredRow> = Vec::new();
    let mut offset = 0usize;
    let mut line_no = 0usize;

    while offset < bytes.len() {
        line_no += 1;
        let Some(newline) = bytes[offset..].iter().position(|b| *b == b'\n') else {
            // torn final line
            break;
        };
        let line = &bytes[offset..offset + newline];
        let next = offset + newline + 1;

        if line.iter().all(u8::is_ascii_whitespace) {
            offset = next;
            continue;
        }

        let entry = match serde_json::from_slice::<JournalEntry>(line) {
            Ok(entry) => entry,
            Err(err) => {
                if has_content(&bytes[next..]) {
                    return Err(LogError::Corrupt {
                        line: line_no,
                        reason: err.to_string(),
                    });
                }
                break;
            }
        };

        match entry {
            JournalEntry::Insert { record, body } => pending.push((record, body)),
            JournalEntry::Commit { count } => {
                if count != pending.len() {
                    return Err(LogError::Corrupt {
                        line: line_no,
                        reason: format!(
                            "commit closes {count} inserts but {} are open",
                            pending.len()
                        ),
                    });
                }
                replay.ops.push(ReplayOp::Batch(std::mem::take(&mut pending)));
                replay.valid_len = next as u64;
            }
            JournalEntry::MarkRead { id } => {
                if !pending.is_empty() {
                    return Err(LogError::Corrupt {
                        line: line_no,
                        reason: "read marker inside an open batch".to_string(),
                    });
                }
                replay.ops.push(ReplayOp::MarkRead(id));
                replay.valid_len = next as u64;
            }
        }
        offset = next;
    }

    replay.discarded_inserts = pending.len();
    Ok(replay)
}

fn has_content(bytes: &[u8]) -> bool {
    bytes.iter().any(|b| !b.is_ascii_whitespace())
}
