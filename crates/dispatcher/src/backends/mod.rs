//! Backend implementations
//!
//! Contains RecordingBackend, LogBackend, NullBackend and InfluxBackend.

mod influx;
mod line_protocol;
mod log;
mod recording;

use std::sync::Arc;

use contracts::{ConfiguredService, MetricsBackend};

pub use self::influx::{InfluxBackend, InfluxConfig};
pub use self::line_protocol::Point;
pub use self::log::{LogBackend, NullBackend};
pub use self::recording::{RecordedPost, RecordingBackend};

/// Expose backends to reconfiguration
macro_rules! impl_configured_backend {
    ($($backend:ty),+ $(,)?) => {
        $(
            impl ConfiguredService for $backend {
                fn as_metrics_backend(self: Arc<Self>) -> Option<Arc<dyn MetricsBackend>> {
                    Some(self)
                }
            }
        )+
    };
}

impl_configured_backend!(RecordingBackend, LogBackend, NullBackend, InfluxBackend);
