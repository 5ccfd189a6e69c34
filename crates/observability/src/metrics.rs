//! 分发指标收集模块
//!
//! 记录 metrics relay 的分发结果、延迟与各 backend 状态。

use contracts::MetricEvent;
use metrics::{counter, gauge, histogram};

/// 记录一次事件分发结果
pub fn record_event_dispatched(event: &MetricEvent, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "metrics_relay_events_dispatched_total",
        "metric" => event.name.clone(),
        "status" => status
    )
    .increment(1);
}

/// 记录分发延迟 (从提交到全部 backend 完成)
pub fn record_dispatch_latency_ms(latency_ms: f64) {
    histogram!("metrics_relay_dispatch_latency_ms").record(latency_ms);
}

/// 记录 backend 累计状态
pub fn record_backend_stats(backend: &str, posts: u64, failures: u64, skipped: u64) {
    let backend = backend.to_string();
    gauge!("metrics_relay_backend_posts", "backend" => backend.clone()).set(posts as f64);
    gauge!("metrics_relay_backend_failures", "backend" => backend.clone()).set(failures as f64);
    gauge!("metrics_relay_backend_skipped", "backend" => backend).set(skipped as f64);
}

/// 记录重新配置
pub fn record_reconfiguration(backend_count: usize) {
    counter!("metrics_relay_reconfigurations_total").increment(1);
    gauge!("metrics_relay_active_backends").set(backend_count as f64);
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 成功分发的事件数
    pub events_ok: u64,

    /// 分发失败的事件数
    pub events_failed: u64,

    /// 分发延迟统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 各指标名的失败次数
    pub failures_by_metric: std::collections::HashMap<String, u64>,
}

impl DispatchStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, event: &MetricEvent, success: bool, latency_ms: f64) {
        if success {
            self.events_ok += 1;
        } else {
            self.events_failed += 1;
            *self
                .failures_by_metric
                .entry(event.name.clone())
                .or_insert(0) += 1;
        }
        self.latency_stats.push(latency_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DispatchSummary {
        let total = self.events_ok + self.events_failed;
        DispatchSummary {
            total_events: total,
            events_ok: self.events_ok,
            events_failed: self.events_failed,
            failure_rate: if total > 0 {
                self.events_failed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            failures_by_metric: self.failures_by_metric.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 分发摘要
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total_events: u64,
    pub events_ok: u64,
    pub events_failed: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
    pub failures_by_metric: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Total events: {}", self.total_events)?;
        writeln!(f, "Delivered: {}", self.events_ok)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.events_failed, self.failure_rate
        )?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.failures_by_metric.is_empty() {
            writeln!(f, "Failures by metric:")?;
            for (metric, count) in &self.failures_by_metric {
                writeln!(f, "  {}: {}", metric, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MetricContext;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DispatchStatsAggregator::new();
        let event = MetricEvent::new("build_time", 42.0, MetricContext::new());

        aggregator.update(&event, true, 1.5);
        aggregator.update(&event, false, 3.5);

        assert_eq!(aggregator.events_ok, 1);
        assert_eq!(aggregator.events_failed, 1);
        assert_eq!(aggregator.failures_by_metric.get("build_time"), Some(&1));

        let summary = aggregator.summary();
        assert_eq!(summary.total_events, 2);
        assert!((summary.failure_rate - 50.0).abs() < 1e-10);
        assert!((summary.latency_ms.mean - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let summary = DispatchSummary {
            total_events: 100,
            events_ok: 95,
            events_failed: 5,
            failure_rate: 5.0,
            latency_ms: StatsSummary {
                count: 100,
                min: 0.2,
                max: 8.0,
                mean: 1.0,
                std_dev: 0.5,
            },
            failures_by_metric: Default::default(),
        };

        let output = format!("{}", summary);
        assert!(output.contains("Total events: 100"));
        assert!(output.contains("5.00%"));
    }
}
