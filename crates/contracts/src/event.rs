//! Metric event data model
//!
//! A `MetricEvent` is one observation: a name, a scalar-or-string value and a
//! free-form context map. Events are built once per post and never mutated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::ContractError;

/// Context key carrying the builder identifier
pub const BUILDER_NAME_KEY: &str = "builder_name";

/// Metric value: a scalar or a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    /// Parse a raw command-line value
    ///
    /// Tries integer, then finite float, then boolean; anything else is kept as text.
    pub fn parse_lossy(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            return Self::Int(v);
        }
        if let Some(v) = raw.parse::<f64>().ok().filter(|v| v.is_finite()) {
            return Self::Float(v);
        }
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Whether the value is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Contextual metadata attached to a metric
///
/// Keys and shape are backend-defined. Backends that need a key look it up
/// through [`MetricContext::require_str`] and get an explicit error when the
/// caller left it out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricContext(BTreeMap<String, Value>);

impl MetricContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// String value for `key`, failing when absent or not a string
    pub fn require_str(&self, key: &str) -> Result<&str, ContractError> {
        match self.0.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ContractError::InvalidContextValue {
                key: key.to_string(),
            }),
            None => Err(ContractError::missing_context_key(key)),
        }
    }

    /// The `builder_name` entry
    pub fn builder_name(&self) -> Result<&str, ContractError> {
        self.require_str(BUILDER_NAME_KEY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MetricContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One observation submitted for forwarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    /// Metric name, as chosen by the emitting step
    pub name: String,
    /// Observed value
    pub value: MetricValue,
    /// Contextual information (step, build, builder...)
    #[serde(default)]
    pub context: MetricContext,
}

impl MetricEvent {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        context: MetricContext,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            context,
        }
    }
}
