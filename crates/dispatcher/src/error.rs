//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// One backend's failure inside an isolated fan-out
#[derive(Debug)]
pub struct BackendFailure {
    /// Backend name
    pub backend: String,
    /// Position in the active set
    pub index: usize,
    /// Error returned by the backend
    pub error: ContractError,
}

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A reconfiguration candidate does not implement the backend capability
    #[error(
        "invalid metrics storage service at position {index}: expected a MetricsBackend, got {type_name}"
    )]
    Configuration {
        index: usize,
        type_name: &'static str,
    },

    /// A backend failed while posting; later backends were not attempted
    #[error("backend '{backend}' failed to post metric: {source}")]
    BackendPost {
        backend: String,
        index: usize,
        #[source]
        source: ContractError,
    },

    /// Several backends failed while posting with failure isolation enabled
    #[error("{} of {attempted} backends failed to post metric", .failures.len())]
    Aggregate {
        attempted: usize,
        failures: Vec<BackendFailure>,
    },

    /// Backend creation error
    #[error("failed to create backend '{name}': {message}")]
    BackendCreation { name: String, message: String },

    /// The dispatch loop is no longer running
    #[error("metrics dispatcher is closed")]
    DispatcherClosed,

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
}

impl DispatcherError {
    /// Create a backend creation error
    pub fn backend_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Names of the backends that failed during the post, if any
    pub fn failed_backends(&self) -> Vec<&str> {
        match self {
            Self::BackendPost { backend, .. } => vec![backend.as_str()],
            Self::Aggregate { failures, .. } => {
                failures.iter().map(|f| f.backend.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}
