//! Error types for the logging bootstrap.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling or applying the logging configuration.
///
/// None of these escape the public lifecycle calls; they are turned into
/// diagnostics and per-source outcomes instead.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed properties at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid path: {0:?}")]
    InvalidPath(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Read interrupted: {0}")]
    Interrupted(String),

    #[error("Logging backend error: {0}")]
    Logging(String),
}

impl From<config::ConfigError> for BootstrapError {
    fn from(err: config::ConfigError) -> Self {
        BootstrapError::ConfigError(err.to_string())
    }
}

impl BootstrapError {
    /// Whether this error carries an interruption that the caller should see.
    pub fn is_interruption(&self) -> bool {
        match self {
            BootstrapError::Interrupted(_) => true,
            BootstrapError::Io(e) => e.kind() == std::io::ErrorKind::Interrupted,
            _ => false,
        }
    }
}
