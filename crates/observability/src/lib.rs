//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - 按命令行详细程度安装 tracing subscriber (JSON/Pretty/Compact)
//! - 按需启动 Prometheus 指标导出
//! - 分发结果、延迟与 backend 状态的指标收集与统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{ObservabilityConfig, Verbosity};
//!
//! observability::init_with_config(ObservabilityConfig {
//!     verbosity: Verbosity::from_flags(false, 1),
//!     ..Default::default()
//! })?;
//!
//! let ok = handle.post_event(event.clone()).await.is_ok();
//! observability::record_event_dispatched(&event, ok);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_backend_stats, record_dispatch_latency_ms, record_event_dispatched,
    record_reconfiguration, DispatchStatsAggregator, DispatchSummary, RunningStats, StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 日志详细程度
    pub verbosity: Verbosity,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 受详细程度控制的 tracing target
const RELAY_TARGETS: &[&str] = &[
    "contracts",
    "config_loader",
    "dispatcher",
    "observability",
    "metrics_relay",
];

/// 日志详细程度 (由 `-q` / `-v` 决定)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// 只输出警告和错误，忽略 RUST_LOG
    Quiet,
    #[default]
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    /// 由命令行参数得到详细程度
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    /// 默认过滤指令
    ///
    /// 只放开本 workspace 的 crate；reqwest、hyper 等第三方 crate 保持在 warn。
    pub fn directive(self) -> String {
        let level = match self {
            Self::Quiet => return "warn".to_string(),
            Self::Normal => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        RELAY_TARGETS
            .iter()
            .fold(String::from("warn"), |acc, target| format!("{acc},{target}={level}"))
    }

    /// 构造过滤器；Quiet 之外 RUST_LOG 优先
    fn filter(self) -> EnvFilter {
        if self == Self::Quiet {
            return EnvFilter::new(self.directive());
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }
}

/// 安装 tracing subscriber，并按配置启动 Prometheus 导出
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(config.verbosity.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_metrics_exporter(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        verbosity = ?config.verbosity,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 启动 Prometheus HTTP 导出 (0.0.0.0:port)
///
/// tracing 已安装时单独调用，例如 `post --metrics-port`。
pub fn install_metrics_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
