//! Backend statistics for observability

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Statistics for a single active backend
#[derive(Debug, Default)]
pub struct BackendStats {
    /// Total successful posts
    post_count: AtomicU64,
    /// Total post failures
    failure_count: AtomicU64,
    /// Total posts not attempted because an earlier backend failed
    skipped_count: AtomicU64,
    /// Duration of the most recent post, in microseconds
    last_latency_us: AtomicU64,
}

impl BackendStats {
    /// Create new stats instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total post count
    pub fn post_count(&self) -> u64 {
        self.post_count.load(Ordering::Relaxed)
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Get skipped count
    pub fn skipped_count(&self) -> u64 {
        self.skipped_count.load(Ordering::Relaxed)
    }

    /// Get latency of the most recent post
    pub fn last_latency_us(&self) -> u64 {
        self.last_latency_us.load(Ordering::Relaxed)
    }

    /// Record a successful post
    pub fn record_success(&self, elapsed: Duration) {
        self.post_count.fetch_add(1, Ordering::Relaxed);
        self.set_latency(elapsed);
    }

    /// Record a failed post
    pub fn record_failure(&self, elapsed: Duration) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.set_latency(elapsed);
    }

    /// Increment skipped count
    pub fn inc_skipped_count(&self) {
        self.skipped_count.fetch_add(1, Ordering::Relaxed);
    }

    fn set_latency(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.last_latency_us.store(micros, Ordering::Relaxed);
    }

    /// Get snapshot of all stats
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            post_count: self.post_count(),
            failure_count: self.failure_count(),
            skipped_count: self.skipped_count(),
            last_latency_us: self.last_latency_us(),
        }
    }
}

/// Snapshot of backend stats (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub post_count: u64,
    pub failure_count: u64,
    pub skipped_count: u64,
    pub last_latency_us: u64,
}

impl StatsSnapshot {
    /// Posts that reached the backend, successful or not
    pub fn attempted(&self) -> u64 {
        self.post_count + self.failure_count
    }
}
