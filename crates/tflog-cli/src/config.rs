//! Viewer configuration.
//!
//! Loaded from an optional TOML file, then overridden by command-line flags
//! and `TFLOG_*` environment variables:
//!
//! ```toml
//! [storage]
//! data_dir = "/var/lib/tflog"
//! journal_file = "records.jsonl"
//! sync_on_commit = true
//!
//! [log]
//! filter = "info"
//! json = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tflog_core::StoreConfig;

use crate::cli::Cli;
use crate::error::CliError;

/// Diagnostic logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit diagnostics as JSON lines.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
            json: false,
        }
    }
}

/// Main viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Record storage.
    #[serde(default)]
    pub storage: StoreConfig,
    /// Diagnostic logging.
    #[serde(default)]
    pub log: LogSettings,
}

impl ViewerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Resolves the effective configuration for a command line: the config
    /// file if one is given, then flag and environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or the result is invalid.
    pub fn load(cli: &Cli) -> Result<Self, CliError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(data_dir) = &cli.data_dir {
            config.storage.data_dir.clone_from(data_dir);
        }
        if let Some(filter) = &cli.log_filter {
            config.log.filter.clone_from(filter);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), CliError> {
        self.storage
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.log.filter.trim().is_empty() {
            return Err(CliError::Config("log filter cannot be empty".to_string()));
        }
        Ok(())
    }
}
