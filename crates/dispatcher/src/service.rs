//! MetricsService - active backend set and sequential fan-out

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    ConfiguredService, ContractError, FanOutPolicy, MetricContext, MetricEvent, MetricValue,
    MetricsBackend,
};

use crate::error::{BackendFailure, DispatcherError};
use crate::metrics::{BackendStats, StatsSnapshot};

/// One entry of the active backend set
struct ActiveBackend {
    name: String,
    backend: Arc<dyn MetricsBackend>,
    stats: Arc<BackendStats>,
}

impl ActiveBackend {
    fn new(backend: Arc<dyn MetricsBackend>) -> Self {
        Self {
            name: backend.name().to_string(),
            backend,
            stats: Arc::new(BackendStats::new()),
        }
    }
}

/// Ordered backend list; the order is the fan-out order
type ActiveSet = Vec<ActiveBackend>;

/// Owner of the active backend set
///
/// `reconfigure` replaces the whole set with one atomic store. Each post loads
/// a single snapshot up front, so a concurrent reconfiguration never changes
/// the backends an in-flight fan-out walks over.
pub struct MetricsService {
    active: ArcSwap<ActiveSet>,
    policy: FanOutPolicy,
}

impl MetricsService {
    /// Create a service with an empty backend set
    pub fn new(policy: FanOutPolicy) -> Self {
        Self {
            active: ArcSwap::from_pointee(Vec::new()),
            policy,
        }
    }

    /// Fan-out failure policy
    pub fn policy(&self) -> FanOutPolicy {
        self.policy
    }

    /// Replace the active backend set
    ///
    /// Every candidate is checked before anything is published. On the first
    /// candidate that is not a metrics backend the current set stays in place.
    ///
    /// Returns the number of active backends.
    #[instrument(
        name = "metrics_service_reconfigure",
        skip(self, candidates),
        fields(candidates = candidates.len())
    )]
    pub fn reconfigure(
        &self,
        candidates: Vec<Arc<dyn ConfiguredService>>,
    ) -> Result<usize, DispatcherError> {
        let mut next = ActiveSet::with_capacity(candidates.len());

        for (index, candidate) in candidates.into_iter().enumerate() {
            let type_name = candidate.type_name();
            let Some(backend) = candidate.as_metrics_backend() else {
                warn!(index, type_name, "Rejected metrics storage service");
                return Err(DispatcherError::Configuration { index, type_name });
            };
            next.push(ActiveBackend::new(backend));
        }

        let count = next.len();
        let names: Vec<&str> = next.iter().map(|b| b.name.as_str()).collect();
        info!(backends = count, names = ?names, "Metrics backends reconfigured");

        self.active.store(Arc::new(next));
        Ok(count)
    }

    /// Forward one metric value to every active backend, in order
    #[instrument(
        name = "metrics_service_post",
        skip(self, value, context),
        fields(metric = %name)
    )]
    pub async fn post_metrics_value(
        &self,
        name: &str,
        value: &MetricValue,
        context: &MetricContext,
    ) -> Result<(), DispatcherError> {
        let snapshot = self.active.load_full();
        if snapshot.is_empty() {
            debug!("No active backends, nothing to post");
            return Ok(());
        }

        match self.policy {
            FanOutPolicy::FailFast => {
                Self::fan_out_fail_fast(&snapshot, name, value, context).await
            }
            FanOutPolicy::Isolate => {
                Self::fan_out_isolated(&snapshot, name, value, context).await
            }
        }
    }

    /// Forward a prebuilt event
    pub async fn post_event(&self, event: &MetricEvent) -> Result<(), DispatcherError> {
        self.post_metrics_value(&event.name, &event.value, &event.context)
            .await
    }

    /// Number of active backends
    pub fn backend_count(&self) -> usize {
        self.active.load().len()
    }

    /// Names of the active backends, in fan-out order
    pub fn backend_names(&self) -> Vec<String> {
        self.active.load().iter().map(|b| b.name.clone()).collect()
    }

    /// Handles of the active backends, in fan-out order
    pub fn active_backends(&self) -> Vec<Arc<dyn MetricsBackend>> {
        self.active
            .load()
            .iter()
            .map(|b| Arc::clone(&b.backend))
            .collect()
    }

    /// Stats for all active backends
    pub fn stats(&self) -> Vec<(String, StatsSnapshot)> {
        self.active
            .load()
            .iter()
            .map(|b| (b.name.clone(), b.stats.snapshot()))
            .collect()
    }

    async fn fan_out_fail_fast(
        set: &ActiveSet,
        name: &str,
        value: &MetricValue,
        context: &MetricContext,
    ) -> Result<(), DispatcherError> {
        for (index, entry) in set.iter().enumerate() {
            if let Err(source) = Self::post_one(entry, name, value, context).await {
                let skipped = &set[index + 1..];
                for later in skipped {
                    later.stats.inc_skipped_count();
                }
                error!(
                    backend = %entry.name,
                    error = %source,
                    skipped = skipped.len(),
                    "Backend post failed, aborting fan-out"
                );
                return Err(DispatcherError::BackendPost {
                    backend: entry.name.clone(),
                    index,
                    source,
                });
            }
        }
        Ok(())
    }

    async fn fan_out_isolated(
        set: &ActiveSet,
        name: &str,
        value: &MetricValue,
        context: &MetricContext,
    ) -> Result<(), DispatcherError> {
        let mut failures = Vec::new();

        for (index, entry) in set.iter().enumerate() {
            if let Err(error) = Self::post_one(entry, name, value, context).await {
                error!(backend = %entry.name, error = %error, "Backend post failed");
                failures.push(BackendFailure {
                    backend: entry.name.clone(),
                    index,
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatcherError::Aggregate {
                attempted: set.len(),
                failures,
            })
        }
    }

    async fn post_one(
        entry: &ActiveBackend,
        name: &str,
        value: &MetricValue,
        context: &MetricContext,
    ) -> Result<(), ContractError> {
        let started = Instant::now();
        let result = entry.backend.post(name, value, context).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(()) => {
                entry.stats.record_success(elapsed);
                debug!(
                    backend = %entry.name,
                    elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                    "Posted"
                );
            }
            Err(_) => entry.stats.record_failure(elapsed),
        }
        result
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new(FanOutPolicy::default())
    }
}
