//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 重新配置的原子性
//! - 扇出顺序与失败策略
//! - 配置 → 分发器 → backend 的端到端流程

#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use contracts::{
        ConfiguredService, ContractError, MetricContext, MetricValue, MetricsBackend,
    };
    use tokio::sync::Notify;

    /// Backend that always fails
    pub struct FailingBackend {
        name: String,
        pub calls: AtomicU64,
    }

    impl FailingBackend {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                calls: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricsBackend for FailingBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn post(
            &self,
            _name: &str,
            _value: &MetricValue,
            _context: &MetricContext,
        ) -> Result<(), ContractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ContractError::backend_write(&self.name, "storage unavailable"))
        }
    }

    impl ConfiguredService for FailingBackend {
        fn as_metrics_backend(self: Arc<Self>) -> Option<Arc<dyn MetricsBackend>> {
            Some(self)
        }
    }

    /// Backend that parks inside `post` until released
    pub struct GateBackend {
        pub entered: Notify,
        pub release: Notify,
    }

    impl GateBackend {
        pub fn new() -> Self {
            Self {
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl MetricsBackend for GateBackend {
        fn name(&self) -> &str {
            "gate"
        }

        async fn post(
            &self,
            _name: &str,
            _value: &MetricValue,
            _context: &MetricContext,
        ) -> Result<(), ContractError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    impl ConfiguredService for GateBackend {
        fn as_metrics_backend(self: Arc<Self>) -> Option<Arc<dyn MetricsBackend>> {
            Some(self)
        }
    }

    /// A configured service that does not store metrics
    pub struct StatusPusher;

    impl ConfiguredService for StatusPusher {}

    pub fn svc<T: ConfiguredService + 'static>(backend: &Arc<T>) -> Arc<dyn ConfiguredService> {
        Arc::clone(backend) as Arc<dyn ConfiguredService>
    }
}

#[cfg(test)]
mod reconfigure_tests {
    use std::sync::Arc;

    use contracts::{MetricContext, MetricValue};
    use dispatcher::{DispatcherError, MetricsService, RecordingBackend};

    use crate::support::{svc as as_service, GateBackend, StatusPusher};

    /// 失败的重新配置保留原有实例（同一对象，而非等价副本）
    #[tokio::test]
    async fn test_failed_reconfigure_keeps_identical_instances() {
        let service = MetricsService::default();
        let first = Arc::new(RecordingBackend::new("first"));
        let second = Arc::new(RecordingBackend::new("second"));
        service
            .reconfigure(vec![as_service(&first), as_service(&second)])
            .unwrap();
        let before = service.active_backends();

        let replacement = Arc::new(RecordingBackend::new("replacement"));
        let err = service
            .reconfigure(vec![
                as_service(&replacement),
                as_service(&Arc::new(StatusPusher)),
            ])
            .unwrap_err();

        match err {
            DispatcherError::Configuration { index, type_name } => {
                assert_eq!(index, 1);
                assert!(type_name.ends_with("StatusPusher"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let after = service.active_backends();
        assert_eq!(before.len(), after.len());
        for (old, new) in before.iter().zip(after.iter()) {
            assert!(Arc::ptr_eq(old, new));
        }

        service
            .post_metrics_value("q", &MetricValue::Int(1), &MetricContext::new())
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(replacement.is_empty());
    }

    #[tokio::test]
    async fn test_reconfigure_to_empty_set() {
        let service = MetricsService::default();
        let rec = Arc::new(RecordingBackend::new("rec"));
        service.reconfigure(vec![as_service(&rec)]).unwrap();

        assert_eq!(service.reconfigure(Vec::new()).unwrap(), 0);
        service
            .post_metrics_value("q", &MetricValue::Int(1), &MetricContext::new())
            .await
            .unwrap();
        assert!(rec.is_empty());
    }

    /// 分发途中重新配置：进行中的分发仍使用开始时的 backend 集合
    #[tokio::test]
    async fn test_in_flight_post_uses_its_snapshot() {
        let service = Arc::new(MetricsService::default());
        let gate = Arc::new(GateBackend::new());
        let old_tail = Arc::new(RecordingBackend::new("old_tail"));
        service
            .reconfigure(vec![as_service(&gate), as_service(&old_tail)])
            .unwrap();

        let in_flight = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .post_metrics_value("q", &MetricValue::Int(7), &MetricContext::new())
                    .await
            })
        };

        gate.entered.notified().await;

        let new_backend = Arc::new(RecordingBackend::new("new"));
        service
            .reconfigure(vec![as_service(&new_backend)])
            .unwrap();
        assert_eq!(service.backend_names(), vec!["new"]);

        gate.release.notify_one();
        in_flight.await.unwrap().unwrap();

        assert_eq!(old_tail.len(), 1);
        assert!(new_backend.is_empty());

        service
            .post_metrics_value("q", &MetricValue::Int(8), &MetricContext::new())
            .await
            .unwrap();
        assert_eq!(old_tail.len(), 1);
        assert_eq!(new_backend.len(), 1);
    }
}

#[cfg(test)]
mod fan_out_tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use contracts::{ConfiguredService, FanOutPolicy, MetricContext, MetricValue};
    use dispatcher::{DispatcherError, MetricsService, RecordingBackend};

    use crate::support::{svc, FailingBackend};

    fn service_with(
        policy: FanOutPolicy,
        backends: Vec<Arc<dyn ConfiguredService>>,
    ) -> MetricsService {
        let service = MetricsService::new(policy);
        service.reconfigure(backends).unwrap();
        service
    }

    #[tokio::test]
    async fn test_posts_are_sequential_in_configuration_order() {
        let rec1 = Arc::new(RecordingBackend::new("rec1"));
        let rec2 = Arc::new(RecordingBackend::new("rec2"));
        let service = service_with(
            FanOutPolicy::FailFast,
            vec![svc(&rec1), svc(&rec2)],
        );

        for i in 0..3i64 {
            service
                .post_metrics_value("q", &MetricValue::Int(i), &MetricContext::new())
                .await
                .unwrap();
        }

        let a = rec1.sequenced();
        let b = rec2.sequenced();
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 3);
        for i in 0..3 {
            // rec1 sees event i before rec2, and rec2 finishes event i before rec1 sees i+1
            assert!(a[i].seq < b[i].seq);
            if i + 1 < 3 {
                assert!(b[i].seq < a[i + 1].seq);
            }
            assert_eq!(a[i].event, b[i].event);
        }
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_backends() {
        let rec1 = Arc::new(RecordingBackend::new("rec1"));
        let broken = Arc::new(FailingBackend::new("broken"));
        let rec3 = Arc::new(RecordingBackend::new("rec3"));
        let service = service_with(
            FanOutPolicy::FailFast,
            vec![svc(&rec1), svc(&broken), svc(&rec3)],
        );

        let err = service
            .post_metrics_value("q", &MetricValue::Float(1.5), &MetricContext::new())
            .await
            .unwrap_err();

        match &err {
            DispatcherError::BackendPost { backend, index, .. } => {
                assert_eq!(backend, "broken");
                assert_eq!(*index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(rec1.len(), 1);
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert!(rec3.is_empty());

        let stats = service.stats();
        assert_eq!(stats[2].1.skipped_count, 1);
        assert_eq!(stats[1].1.failure_count, 1);
    }

    #[tokio::test]
    async fn test_isolate_reaches_every_backend() {
        let rec1 = Arc::new(RecordingBackend::new("rec1"));
        let broken = Arc::new(FailingBackend::new("broken"));
        let rec3 = Arc::new(RecordingBackend::new("rec3"));
        let service = service_with(
            FanOutPolicy::Isolate,
            vec![svc(&rec1), svc(&broken), svc(&rec3)],
        );

        let err = service
            .post_metrics_value("q", &MetricValue::Float(1.5), &MetricContext::new())
            .await
            .unwrap_err();

        assert_eq!(rec1.len(), 1);
        assert_eq!(rec3.len(), 1);
        assert_eq!(err.failed_backends(), vec!["broken"]);
        assert!(matches!(
            err,
            DispatcherError::Aggregate { attempted: 3, .. }
        ));
    }
}

#[cfg(test)]
mod influx_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::thread::{self, ThreadId};

    use contracts::{ContractError, MetricContext, MetricValue, MetricsBackend};
    use dispatcher::{BlockingWriter, InfluxBackend, InfluxConfig};
    use parking_lot::Mutex;

    struct ThreadProbe {
        seen: Arc<Mutex<Vec<(ThreadId, String)>>>,
    }

    impl BlockingWriter for ThreadProbe {
        fn write(&mut self, payload: &str) -> Result<(), ContractError> {
            self.seen
                .lock()
                .push((thread::current().id(), payload.to_string()));
            Ok(())
        }
    }

    /// 写入在独立线程执行，调用方线程不被阻塞
    #[tokio::test]
    async fn test_writes_run_off_the_caller_thread() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let probe_seen = Arc::clone(&seen);
        let backend = InfluxBackend::connect_with(
            "influx",
            InfluxConfig::new("localhost", "metrics"),
            move || Ok(ThreadProbe { seen: probe_seen }),
        )
        .await;
        assert!(backend.is_initialized());

        let context = MetricContext::new().with("builder_name", "linux");
        backend
            .post("build_time", &MetricValue::Float(12.5), &context)
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_ne!(seen[0].0, thread::current().id());
        assert_eq!(
            seen[0].1,
            "linux-build_time,buildername=linux name=\"build_time\",value=12.5"
        );
    }

    /// 未初始化的 backend 不进行任何写入，也不检查 context
    #[tokio::test]
    async fn test_uninitialized_backend_is_a_no_op() {
        let attempts = Arc::new(AtomicU64::new(0));
        let factory_attempts = Arc::clone(&attempts);

        let backend = InfluxBackend::connect_with(
            "influx",
            InfluxConfig::new("localhost", "metrics"),
            move || {
                factory_attempts.fetch_add(1, Ordering::SeqCst);
                Err::<ThreadProbe, _>(ContractError::backend_connection("influx", "refused"))
            },
        )
        .await;
        assert!(!backend.is_initialized());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        for _ in 0..3 {
            backend
                .post("build_time", &MetricValue::Int(1), &MetricContext::new())
                .await
                .unwrap();
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_builder_name_is_reported() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let probe_seen = Arc::clone(&seen);
        let backend = InfluxBackend::connect_with(
            "influx",
            InfluxConfig::new("localhost", "metrics"),
            move || Ok(ThreadProbe { seen: probe_seen }),
        )
        .await;

        let err = backend
            .post("build_time", &MetricValue::Int(1), &MetricContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::MissingContextKey { .. }));
        assert!(seen.lock().is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{FanOutPolicy, MetricContext, MetricEvent};
    use dispatcher::MetricsDispatcher;
    use observability::DispatchStatsAggregator;

    const RELAY_TOML: &str = r#"
[dispatch]
fan_out = "isolate"
queue_capacity = 8

[[backends]]
name = "audit"
backend_type = "recording"

[[backends]]
name = "influx"
backend_type = "influx"
[backends.params]
host = "not a host"
database = "metrics"

[[backends]]
name = "log"
backend_type = "log"
"#;

    /// End-to-end: TOML -> ConfigLoader -> MetricsDispatcher -> backends
    #[tokio::test]
    async fn test_e2e_config_to_backends() {
        let config = ConfigLoader::load_from_str(RELAY_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.dispatch.fan_out, FanOutPolicy::Isolate);

        let (relay, handle) = MetricsDispatcher::from_config(&config).await.unwrap();
        let service = relay.service().clone();
        assert_eq!(service.backend_names(), vec!["audit", "influx", "log"]);
        let task = relay.spawn();

        let mut aggregator = DispatchStatsAggregator::new();
        for i in 0..5i64 {
            let event = MetricEvent::new(
                "tests_run",
                i,
                MetricContext::new().with("builder_name", "linux"),
            );
            let ok = handle.post_event(event.clone()).await.is_ok();
            aggregator.update(&event, ok, 0.0);
        }

        drop(handle);
        task.await.unwrap();

        let summary = aggregator.summary();
        assert_eq!(summary.events_ok, 5);
        assert_eq!(summary.events_failed, 0);

        // The influx backend could not build its client and accepts posts as no-ops
        for (_, stats) in service.stats() {
            assert_eq!(stats.post_count, 5);
            assert_eq!(stats.failure_count, 0);
        }
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_dispatch() {
        let toml = r#"
[[backends]]
name = "dup"
backend_type = "log"

[[backends]]
name = "dup"
backend_type = "null"
"#;
        let err = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("duplicate backend name"));
    }
}
