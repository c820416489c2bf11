//! CLI error types.

use thiserror::Error;
use tflog_core::LogError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A core operation failed.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_config() {
        let err = CliError::Config("bad filter".into());
        assert_eq!(err.to_string(), "configuration error: bad filter");
    }

    #[test]
    fn cli_error_wraps_core_error_transparently() {
        let err = CliError::from(LogError::NotFound(9));
        assert_eq!(err.to_string(), "log record not found: 9");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
