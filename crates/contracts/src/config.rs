//! RelayConfig - Config Loader output
//!
//! Describes the dispatch policy and the ordered list of storage backends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Full relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Dispatch behavior
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Storage backends, in fan-out order
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

/// How the dispatcher delivers events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Failure policy for a single fan-out
    #[serde(default)]
    pub fan_out: FanOutPolicy,

    /// Capacity of the dispatch request queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fan_out: FanOutPolicy::default(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    64
}

/// What happens to the remaining backends when one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOutPolicy {
    /// Stop at the first failing backend and report its error
    #[default]
    FailFast,
    /// Attempt every backend, then report all failures together
    Isolate,
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name
    pub name: String,

    /// Backend type
    pub backend_type: BackendType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// InfluxDB over its HTTP write API (offloaded)
    Influx,
    /// Structured log output
    Log,
    /// In-memory recorder
    Recording,
    /// Accepts and discards everything
    Null,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Influx => "influx",
            Self::Log => "log",
            Self::Recording => "recording",
            Self::Null => "null",
        }
    }
}
