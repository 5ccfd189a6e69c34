//! `post` command implementation.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{MetricContext, MetricEvent, MetricValue};
use dispatcher::MetricsDispatcher;
use observability::{
    record_backend_stats, record_dispatch_latency_ms, record_event_dispatched,
    record_reconfiguration, DispatchStatsAggregator,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::PostArgs;
use crate::error::CliError;
use crate::stats::PostReport;

/// Execute the `post` command
pub async fn run_post(args: &PostArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let events = collect_events(args)?;
    if events.is_empty() {
        return Err(CliError::NoEvents.into());
    }

    if args.metrics_port != 0 {
        observability::install_metrics_exporter(args.metrics_port)?;
    }

    let (relay, handle) = MetricsDispatcher::from_config(&config)
        .await
        .context("Failed to build backends")?;
    let service = relay.service().clone();
    record_reconfiguration(service.backend_count());

    info!(
        backends = service.backend_count(),
        fan_out = ?service.policy(),
        events = events.len(),
        "Relay ready"
    );

    let task = relay.spawn();
    let start_time = Instant::now();
    let mut aggregator = DispatchStatsAggregator::new();

    for event in events {
        let started = Instant::now();
        let result = handle.post_event(event.clone()).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        if let Err(ref e) = result {
            warn!(metric = %event.name, error = %e, "Failed to post metric");
        }

        let ok = result.is_ok();
        record_event_dispatched(&event, ok);
        record_dispatch_latency_ms(latency_ms);
        aggregator.update(&event, ok, latency_ms);
    }

    drop(handle);
    task.await.context("Dispatcher task panicked")?;

    let backends = service.stats();
    for (name, snapshot) in &backends {
        record_backend_stats(
            name,
            snapshot.post_count,
            snapshot.failure_count,
            snapshot.skipped_count,
        );
    }

    let report = PostReport {
        summary: aggregator.summary(),
        backends,
        duration: start_time.elapsed(),
    };
    report.print_summary();

    if report.summary.events_failed > 0 {
        return Err(CliError::PostFailed {
            failed: report.summary.events_failed,
            total: report.summary.total_events,
        }
        .into());
    }

    Ok(())
}

/// Gather the single `--name/--value` event followed by any events file entries
fn collect_events(args: &PostArgs) -> Result<Vec<MetricEvent>, CliError> {
    let mut events = Vec::new();

    if let (Some(name), Some(value)) = (&args.name, &args.value) {
        let context = parse_context(&args.context)?;
        events.push(MetricEvent::new(
            name.clone(),
            MetricValue::parse_lossy(value),
            context,
        ));
    }

    if let Some(ref path) = args.events {
        events.extend(read_events_file(path)?);
    }

    Ok(events)
}

/// Parse `KEY=VALUE` entries; values that parse as JSON keep their type
fn parse_context(entries: &[String]) -> Result<MetricContext, CliError> {
    let mut context = MetricContext::new();
    for entry in entries {
        let (key, raw) = entry
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| CliError::invalid_context(entry))?;
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        context.insert(key, value);
    }
    Ok(context)
}

/// Read a JSON-lines events file, skipping blank lines and `#` comments
fn read_events_file(path: &Path) -> Result<Vec<MetricEvent>, CliError> {
    let content = std::fs::read_to_string(path)?;
    let display = path.display().to_string();

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str::<MetricEvent>(line)
                .map_err(|e| CliError::invalid_event(&display, idx + 1, e.to_string()))
        })
        .collect()
}
