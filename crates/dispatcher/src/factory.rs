//! Backend factory - builds backends from configuration

use std::sync::Arc;

use tracing::instrument;

use contracts::{BackendConfig, BackendType, ConfiguredService};

use crate::backends::{InfluxBackend, InfluxConfig, LogBackend, NullBackend, RecordingBackend};
use crate::error::DispatcherError;

/// Create a backend from configuration
///
/// An Influx backend whose client cannot be built is still returned, in its
/// uninitialized state.
#[instrument(
    name = "dispatcher_build_backend",
    skip(config),
    fields(backend = %config.name, backend_type = ?config.backend_type)
)]
pub async fn build_backend(
    config: &BackendConfig,
) -> Result<Arc<dyn ConfiguredService>, DispatcherError> {
    match config.backend_type {
        BackendType::Log => Ok(Arc::new(LogBackend::new(&config.name))),
        BackendType::Recording => Ok(Arc::new(RecordingBackend::new(&config.name))),
        BackendType::Null => Ok(Arc::new(NullBackend::new(&config.name))),
        BackendType::Influx => {
            let influx = InfluxConfig::from_params(&config.params)
                .map_err(|e| DispatcherError::backend_creation(&config.name, e))?;
            Ok(Arc::new(InfluxBackend::connect(&config.name, influx).await))
        }
    }
}

/// Create all backends, preserving configuration order
#[instrument(
    name = "dispatcher_build_backends",
    skip(configs),
    fields(backend_count = configs.len())
)]
pub async fn build_backends(
    configs: &[BackendConfig],
) -> Result<Vec<Arc<dyn ConfiguredService>>, DispatcherError> {
    let mut backends = Vec::with_capacity(configs.len());
    for config in configs {
        backends.push(build_backend(config).await?);
    }
    Ok(backends)
}
