//! MetricsBackend trait - Dispatcher output interface
//!
//! Defines the abstract interface for metric storage backends, and the
//! capability query the dispatcher runs on configured services.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{ContractError, MetricContext, MetricValue};

/// Metric storage backend
///
/// All backend implementations must implement this trait. The default `post`
/// succeeds immediately without doing anything, for backends that only care
/// about specific event shapes.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Backend name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Forward one metric value
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn post(
        &self,
        _name: &str,
        _value: &MetricValue,
        _context: &MetricContext,
    ) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Anything the configuration layer can hand to the metrics service
///
/// Only services that expose themselves through `as_metrics_backend` are
/// accepted as backends; everything else is rejected at reconfiguration.
pub trait ConfiguredService: Send + Sync {
    /// Concrete type name, used in configuration errors
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// View this service as a metrics backend
    fn as_metrics_backend(self: Arc<Self>) -> Option<Arc<dyn MetricsBackend>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;

    impl MetricsBackend for Quiet {
        fn name(&self) -> &str {
            "quiet"
        }
    }

    impl ConfiguredService for Quiet {
        fn as_metrics_backend(self: Arc<Self>) -> Option<Arc<dyn MetricsBackend>> {
            Some(self)
        }
    }

    struct NotABackend;

    impl ConfiguredService for NotABackend {}

    #[tokio::test]
    async fn test_default_post_succeeds() {
        let backend = Quiet;
        let result = backend
            .post("q", &MetricValue::Int(1), &MetricContext::new())
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_capability_query() {
        let svc: Arc<dyn ConfiguredService> = Arc::new(Quiet);
        assert!(svc.as_metrics_backend().is_some());

        let svc: Arc<dyn ConfiguredService> = Arc::new(NotABackend);
        assert!(svc.type_name().ends_with("NotABackend"));
        assert!(svc.as_metrics_backend().is_none());
    }
}
