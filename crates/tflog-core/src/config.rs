//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

/// Default journal file name inside the data directory.
pub const DEFAULT_JOURNAL_FILE: &str = "records.jsonl";

/// Configuration for a journal-backed [`Store`](crate::store::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the journal.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Journal file name within `data_dir`.
    #[serde(default = "default_journal_file")]
    pub journal_file: String,
    /// Whether every commit is fsynced before it becomes visible.
    #[serde(default = "default_sync_on_commit")]
    pub sync_on_commit: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_journal_file() -> String {
    DEFAULT_JOURNAL_FILE.to_string()
}

const fn default_sync_on_commit() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            journal_file: default_journal_file(),
            sync_on_commit: default_sync_on_commit(),
        }
    }
}

impl StoreConfig {
    /// Creates a config rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Sets the journal file name.
    #[must_use]
    pub fn with_journal_file(mut self, name: impl Into<String>) -> Self {
        self.journal_file = name.into();
        self
    }

    /// Sets whether commits are fsynced.
    #[must_use]
    pub fn with_sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }

    /// Full path of the journal file.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(&self.journal_file)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Config`] if the journal name is empty or not a
    /// plain file name.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(LogError::Config("data_dir cannot be empty".to_string()));
        }
        if self.journal_file.is_empty() {
            return Err(LogError::Config("journal_file cannot be empty".to_string()));
        }
        if self.journal_file.contains(['/', '\\']) || self.journal_file == ".." {
            return Err(LogError::Config(format!(
                "journal_file must be a plain file name, got '{}'",
                self.journal_file
            )));
        }
        Ok(())
    }
}
