//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Malformed `--context` argument
    #[error("Invalid context entry '{entry}': expected KEY=VALUE")]
    InvalidContext { entry: String },

    /// Malformed line in an events file
    #[error("Invalid event at {path}:{line}: {message}")]
    InvalidEvent {
        path: String,
        line: usize,
        message: String,
    },

    /// Nothing to post
    #[error("No events given: pass --name/--value or --events")]
    NoEvents,

    /// One or more posts failed
    #[error("{failed} of {total} events failed to post")]
    PostFailed { failed: u64, total: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_context(entry: impl Into<String>) -> Self {
        Self::InvalidContext {
            entry: entry.into(),
        }
    }

    pub fn invalid_event(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
