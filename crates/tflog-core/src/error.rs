//! Error types for ingestion, storage and queries.

use thiserror::Error;

/// Errors that can occur while importing, storing or querying log records.
#[derive(Debug, Error)]
pub enum LogError {
    /// No log record exists with the given ID.
    #[error("log record not found: {0}")]
    NotFound(u64),

    /// The log record has no stored request/response body row.
    #[error("no body stored for log record: {0}")]
    BodyNotFound(u64),

    /// A query parameter was rejected before touching storage.
    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),

    /// The store configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A committed journal line could not be decoded.
    #[error("corrupt journal at line {line}: {reason}")]
    Corrupt {
        /// 1-based line number in the journal file.
        line: usize,
        /// Decoder message.
        reason: String,
    },

    /// Another store holds the journal's lock file.
    #[error(
        "journal is in use by another process (pid {holder}); remove {} if no tflog process is running",
        .path.display()
    )]
    Locked {
        /// The lock file.
        path: std::path::PathBuf,
        /// Process id recorded by the holder.
        holder: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// Returns true for both record and body lookups that found nothing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::BodyNotFound(_))
    }

    /// Returns true for failures of the durable storage layer.
    #[must_use]
    pub const fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Serialization(_) | Self::Corrupt { .. })
    }

    pub(crate) fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }
}

/// Result type alias for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
