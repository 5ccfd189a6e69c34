//! # Dispatcher
//!
//! Metric dispatch module.
//!
//! Responsible for:
//! - Holding the active backend set and swapping it atomically on reconfiguration
//! - Sequential fan-out of each metric event to every active backend
//! - Keeping blocking backend clients off the dispatch path

pub mod backends;
pub mod dispatcher;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod offload;
pub mod service;

pub use backends::{
    InfluxBackend, InfluxConfig, LogBackend, NullBackend, Point, RecordedPost, RecordingBackend,
};
pub use contracts::{ConfiguredService, MetricContext, MetricEvent, MetricValue, MetricsBackend};
pub use dispatcher::{MetricsDispatcher, MetricsHandle};
pub use error::{BackendFailure, DispatcherError};
pub use factory::{build_backend, build_backends};
pub use metrics::{BackendStats, StatsSnapshot};
pub use offload::{BlockingWriter, OffloadWorker};
pub use service::MetricsService;
