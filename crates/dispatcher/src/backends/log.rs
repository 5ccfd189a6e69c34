//! LogBackend - logs metric values via tracing

use async_trait::async_trait;
use contracts::{ContractError, MetricContext, MetricValue, MetricsBackend};
use tracing::info;

/// Backend that logs every metric for debugging
pub struct LogBackend {
    name: String,
}

impl LogBackend {
    /// Create a new LogBackend with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl MetricsBackend for LogBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn post(
        &self,
        name: &str,
        value: &MetricValue,
        context: &MetricContext,
    ) -> Result<(), ContractError> {
        let context = serde_json::to_string(context).unwrap_or_default();
        info!(
            backend = %self.name,
            metric = %name,
            value = %value,
            context = %context,
            "Metric received"
        );
        Ok(())
    }
}

/// Backend that accepts and discards everything
pub struct NullBackend {
    name: String,
}

impl NullBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl MetricsBackend for NullBackend {
    fn name(&self) -> &str {
        &self.name
    }
}
