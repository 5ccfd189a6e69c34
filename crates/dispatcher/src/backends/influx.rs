//! InfluxBackend - InfluxDB writes offloaded to a blocking worker

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, instrument, trace, warn};

use contracts::{ContractError, MetricContext, MetricValue, MetricsBackend};

use super::line_protocol::Point;
use crate::offload::{BlockingWriter, OffloadWorker};

/// Configuration for InfluxBackend
#[derive(Debug, Clone, PartialEq)]
pub struct InfluxConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// User for basic auth (optional)
    pub user: Option<String>,
    /// Password for basic auth (optional)
    pub password: Option<String>,
    /// Target database
    pub database: String,
    /// Use https
    pub tls: bool,
    /// Pending writes allowed before posts wait for room
    pub queue_capacity: usize,
}

impl InfluxConfig {
    /// Create config with default port and no credentials
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 8086,
            user: None,
            password: None,
            database: database.into(),
            tls: false,
            queue_capacity: 64,
        }
    }

    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let host = params
            .get("host")
            .ok_or_else(|| "missing 'host' parameter".to_string())?;
        let database = params
            .get("database")
            .ok_or_else(|| "missing 'database' parameter".to_string())?;

        let mut config = Self::new(host, database);

        if let Some(port) = params.get("port") {
            config.port = port
                .parse()
                .map_err(|e| format!("invalid port '{}': {}", port, e))?;
        }
        if let Some(tls) = params.get("tls") {
            config.tls = tls
                .parse()
                .map_err(|e| format!("invalid tls flag '{}': {}", tls, e))?;
        }
        if let Some(capacity) = params.get("queue_capacity") {
            config.queue_capacity = capacity
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .ok_or_else(|| format!("invalid queue_capacity '{}'", capacity))?;
        }
        config.user = params.get("user").cloned();
        config.password = params.get("password").cloned();

        Ok(config)
    }

    /// Write endpoint, `{scheme}://{host}:{port}/write?db={database}`
    pub fn write_url(&self) -> Result<Url, String> {
        let scheme = if self.tls { "https" } else { "http" };
        let mut url = Url::parse(&format!("{}://{}:{}/write", scheme, self.host, self.port))
            .map_err(|e| format!("invalid address '{}:{}': {}", self.host, self.port, e))?;
        url.query_pairs_mut().append_pair("db", &self.database);
        Ok(url)
    }
}

/// Blocking HTTP client for the InfluxDB write API
struct HttpLineWriter {
    backend: String,
    client: reqwest::blocking::Client,
    url: Url,
    user: Option<String>,
    password: Option<String>,
}

impl HttpLineWriter {
    fn connect(backend: String, config: &InfluxConfig) -> Result<Self, ContractError> {
        let url = config
            .write_url()
            .map_err(|e| ContractError::backend_connection(&backend, e))?;
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ContractError::backend_connection(&backend, e.to_string()))?;

        Ok(Self {
            backend,
            client,
            url,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }
}

impl BlockingWriter for HttpLineWriter {
    fn write(&mut self, payload: &str) -> Result<(), ContractError> {
        let mut request = self.client.post(self.url.clone()).body(payload.to_owned());
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.password.as_deref());
        }

        request
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| ContractError::backend_write(&self.backend, e.to_string()))?;
        Ok(())
    }
}

/// Backend that forwards metrics to InfluxDB
///
/// Network writes never run on the dispatch path: they go through an
/// [`OffloadWorker`]. If the client cannot be built the backend stays
/// uninitialized and every post is a successful no-op.
pub struct InfluxBackend {
    name: String,
    config: InfluxConfig,
    worker: Option<OffloadWorker>,
}

impl InfluxBackend {
    /// Create a backend backed by the HTTP write API
    ///
    /// Never fails: an unusable client leaves the backend uninitialized.
    #[instrument(name = "influx_backend_connect", skip(name, config), fields(host = %config.host, port = config.port))]
    pub async fn connect(name: impl Into<String>, config: InfluxConfig) -> Self {
        let name = name.into();
        let writer_name = name.clone();
        let writer_config = config.clone();

        Self::connect_with(name, config, move || {
            HttpLineWriter::connect(writer_name, &writer_config)
        })
        .await
    }

    /// Create a backend around a caller-supplied blocking writer
    pub async fn connect_with<W, F>(name: impl Into<String>, config: InfluxConfig, factory: F) -> Self
    where
        W: BlockingWriter,
        F: FnOnce() -> Result<W, ContractError> + Send + 'static,
    {
        let name = name.into();
        let worker = match OffloadWorker::start(&name, config.queue_capacity, factory).await {
            Ok(worker) => {
                info!(
                    backend = %name,
                    database = %config.database,
                    "InfluxDB client initialized"
                );
                Some(worker)
            }
            Err(e) => {
                warn!(
                    backend = %name,
                    error = %e,
                    "InfluxDB client unavailable, backend disabled"
                );
                None
            }
        };

        Self {
            name,
            config,
            worker,
        }
    }

    /// Whether the underlying client was built
    pub fn is_initialized(&self) -> bool {
        self.worker.is_some()
    }

    /// Get backend configuration
    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// Point for one metric: measurement `{builder}-{name}`, tagged by builder
    pub fn metric_point(builder: &str, name: &str, value: &MetricValue) -> Point {
        Point::new(format!("{builder}-{name}"))
            .tag("buildername", builder)
            .field("name", name)
            .field("value", value.clone())
    }
}

#[async_trait]
impl MetricsBackend for InfluxBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "influx_backend_post",
        skip(self, value, context),
        fields(backend = %self.name, metric = %name)
    )]
    async fn post(
        &self,
        name: &str,
        value: &MetricValue,
        context: &MetricContext,
    ) -> Result<(), ContractError> {
        let Some(worker) = &self.worker else {
            trace!(backend = %self.name, "Not initialized, skipping");
            return Ok(());
        };

        let builder = context.builder_name()?;
        let line = Self::metric_point(builder, name, value)
            .to_line()
            .map_err(|e| ContractError::backend_write(&self.name, e))?;

        debug!(
            backend = %self.name,
            builder,
            value = %value,
            "Sending data to InfluxDB"
        );
        worker.submit(line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct CapturingWriter {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl BlockingWriter for CapturingWriter {
        fn write(&mut self, payload: &str) -> Result<(), ContractError> {
            self.lines.lock().push(payload.to_string());
            Ok(())
        }
    }

    async fn capturing_backend() -> (InfluxBackend, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let writer_lines = Arc::clone(&lines);
        let backend = InfluxBackend::connect_with(
            "influx",
            InfluxConfig::new("localhost", "metrics"),
            move || Ok(CapturingWriter {
                lines: writer_lines,
            }),
        )
        .await;
        (backend, lines)
    }

    #[test]
    fn test_influx_config_parsing() {
        let params = HashMap::from([
            ("host".to_string(), "influx.local".to_string()),
            ("port".to_string(), "9999".to_string()),
            ("user".to_string(), "bb".to_string()),
            ("database".to_string(), "builds".to_string()),
        ]);

        let config = InfluxConfig::from_params(&params).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.user.as_deref(), Some("bb"));
        assert_eq!(config.password, None);
        assert_eq!(
            config.write_url().unwrap().as_str(),
            "http://influx.local:9999/write?db=builds"
        );
    }

    #[test]
    fn test_influx_config_missing_host() {
        let params = HashMap::from([("database".to_string(), "builds".to_string())]);
        let err = InfluxConfig::from_params(&params).unwrap_err();
        assert!(err.contains("host"));
    }

    #[test]
    fn test_influx_config_zero_queue_capacity() {
        let params = HashMap::from([
            ("host".to_string(), "influx.local".to_string()),
            ("database".to_string(), "builds".to_string()),
            ("queue_capacity".to_string(), "0".to_string()),
        ]);
        let err = InfluxConfig::from_params(&params).unwrap_err();
        assert!(err.contains("queue_capacity"), "got: {err}");
    }

    #[tokio::test]
    async fn test_post_writes_builder_point() {
        let (backend, lines) = capturing_backend().await;
        assert!(backend.is_initialized());

        let ctx = MetricContext::new().with("builder_name", "linux-x64");
        backend
            .post("build_time", &MetricValue::Float(42.5), &ctx)
            .await
            .unwrap();

        assert_eq!(
            lines.lock().as_slice(),
            [r#"linux-x64-build_time,buildername=linux-x64 name="build_time",value=42.5"#]
        );
    }

    #[tokio::test]
    async fn test_post_without_builder_name_fails() {
        let (backend, lines) = capturing_backend().await;

        let err = backend
            .post("build_time", &MetricValue::Int(1), &MetricContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ContractError::MissingContextKey { .. }));
        assert!(lines.lock().is_empty());
    }

    #[tokio::test]
    async fn test_multiline_builder_name_never_reaches_writer() {
        let (backend, lines) = capturing_backend().await;

        let ctx = MetricContext::new().with("builder_name", "linux\nevil,host=x value=666i 0");
        let err = backend
            .post("build_time", &MetricValue::Int(1), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, ContractError::BackendWrite { .. }));
        assert!(lines.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_address_leaves_backend_uninitialized() {
        let backend =
            InfluxBackend::connect("influx", InfluxConfig::new("not a host", "metrics")).await;
        assert!(!backend.is_initialized());

        // No builder_name either: an uninitialized backend never looks at the context
        let result = backend
            .post("q", &MetricValue::Int(1), &MetricContext::new())
            .await;
        assert!(result.is_ok());
    }
}
