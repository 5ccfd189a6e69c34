//! Dispatcher - main loop serving metric posts one at a time

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{ConfiguredService, MetricContext, MetricEvent, MetricValue, RelayConfig};

use crate::error::DispatcherError;
use crate::factory::build_backends;
use crate::metrics::StatsSnapshot;
use crate::service::MetricsService;

/// A post waiting for the dispatch loop
struct DispatchRequest {
    event: MetricEvent,
    reply: oneshot::Sender<Result<(), DispatcherError>>,
}

/// The dispatch loop
///
/// Takes one request at a time and drives its fan-out to completion before
/// accepting the next, so there is a single logical dispatch path.
pub struct MetricsDispatcher {
    service: Arc<MetricsService>,
    input_rx: mpsc::Receiver<DispatchRequest>,
}

/// Cloneable entry point for callers
#[derive(Clone)]
pub struct MetricsHandle {
    service: Arc<MetricsService>,
    tx: mpsc::Sender<DispatchRequest>,
}

impl MetricsDispatcher {
    /// Create a dispatcher around an existing service
    pub fn new(service: Arc<MetricsService>, queue_capacity: usize) -> (Self, MetricsHandle) {
        let (tx, input_rx) = mpsc::channel(queue_capacity.max(1));
        let handle = MetricsHandle {
            service: Arc::clone(&service),
            tx,
        };
        (Self { service, input_rx }, handle)
    }

    /// Build backends from configuration and install them
    #[instrument(
        name = "dispatcher_from_config",
        skip(config),
        fields(backends = config.backends.len(), fan_out = ?config.dispatch.fan_out)
    )]
    pub async fn from_config(
        config: &RelayConfig,
    ) -> Result<(Self, MetricsHandle), DispatcherError> {
        let service = Arc::new(MetricsService::new(config.dispatch.fan_out));
        let backends = build_backends(&config.backends).await?;
        service.reconfigure(backends)?;
        Ok(Self::new(service, config.dispatch.queue_capacity))
    }

    /// Get the shared service
    pub fn service(&self) -> &Arc<MetricsService> {
        &self.service
    }

    /// Get stats for all active backends
    pub fn stats(&self) -> Vec<(String, StatsSnapshot)> {
        self.service.stats()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns when every handle has been dropped.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) {
        info!(
            backends = self.service.backend_count(),
            "Metrics dispatcher started"
        );

        let mut event_count: u64 = 0;
        let mut failure_count: u64 = 0;

        while let Some(request) = self.input_rx.recv().await {
            event_count += 1;
            let result = self.service.post_event(&request.event).await;
            if result.is_err() {
                failure_count += 1;
            }
            if request.reply.send(result).is_err() {
                debug!(metric = %request.event.name, "Caller went away before dispatch completed");
            }

            if event_count.is_multiple_of(100) {
                debug!(events = event_count, "Dispatcher progress");
            }
        }

        info!(
            events = event_count,
            failures = failure_count,
            "Metrics dispatcher input closed, shutting down"
        );
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}

impl MetricsHandle {
    /// Forward one metric value through the dispatch loop
    pub async fn post_metrics_value(
        &self,
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        context: MetricContext,
    ) -> Result<(), DispatcherError> {
        self.post_event(MetricEvent::new(name, value, context)).await
    }

    /// Forward a prebuilt event through the dispatch loop
    pub async fn post_event(&self, event: MetricEvent) -> Result<(), DispatcherError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(DispatchRequest { event, reply })
            .await
            .map_err(|_| DispatcherError::DispatcherClosed)?;
        reply_rx
            .await
            .map_err(|_| DispatcherError::DispatcherClosed)?
    }

    /// Replace the active backend set
    pub fn reconfigure(
        &self,
        candidates: Vec<Arc<dyn ConfiguredService>>,
    ) -> Result<usize, DispatcherError> {
        self.service.reconfigure(candidates)
    }

    /// Get the shared service
    pub fn service(&self) -> &Arc<MetricsService> {
        &self.service
    }
}
