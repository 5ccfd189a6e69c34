//! Post run statistics.

use std::time::Duration;

use dispatcher::StatsSnapshot;
use observability::DispatchSummary;

/// Statistics from a `post` run
#[derive(Debug, Clone, Default)]
pub struct PostReport {
    /// Per-event outcome summary
    pub summary: DispatchSummary,

    /// Per-backend counters, in dispatch order
    pub backends: Vec<(String, StatsSnapshot)>,

    /// Total duration of the run
    pub duration: Duration,
}

impl PostReport {
    /// Events per second throughput
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.summary.total_events as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Relay Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Events: {}", self.summary.total_events);
        println!("   ├─ Delivered: {}", self.summary.events_ok);
        println!(
            "   ├─ Failed: {} ({:.2}%)",
            self.summary.events_failed, self.summary.failure_rate
        );
        println!("   ├─ Throughput: {:.2} events/s", self.throughput());
        println!("   └─ Latency (ms): {}", self.summary.latency_ms);

        if !self.backends.is_empty() {
            println!("\n📤 Backends ({})", self.backends.len());
            for (i, (name, stats)) in self.backends.iter().enumerate() {
                let prefix = if i == self.backends.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: posted={} failed={} skipped={} last={}µs",
                    prefix,
                    name,
                    stats.post_count,
                    stats.failure_count,
                    stats.skipped_count,
                    stats.last_latency_us
                );
            }
        }

        if !self.summary.failures_by_metric.is_empty() {
            println!("\n⚠️  Failures by Metric");
            for (metric, count) in &self.summary.failures_by_metric {
                println!("   ├─ {}: {}", metric, count);
            }
        }

        println!();
    }
}
