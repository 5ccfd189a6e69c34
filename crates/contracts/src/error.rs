//! Layered error definitions
//!
//! Categorized by source: config / context / backend

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Event Errors =====
    /// A backend needed a context key the caller did not supply
    #[error("metric context is missing required key '{key}'")]
    MissingContextKey { key: String },

    /// Context value exists but has the wrong shape
    #[error("metric context key '{key}' must be a string")]
    InvalidContextValue { key: String },

    // ===== Backend Errors =====
    /// Backend write error
    #[error("backend '{backend}' write error: {message}")]
    BackendWrite { backend: String, message: String },

    /// Backend connection error
    #[error("backend '{backend}' connection error: {message}")]
    BackendConnection { backend: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing context key error
    pub fn missing_context_key(key: impl Into<String>) -> Self {
        Self::MissingContextKey { key: key.into() }
    }

    /// Create backend write error
    pub fn backend_write(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendWrite {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create backend connection error
    pub fn backend_connection(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendConnection {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
