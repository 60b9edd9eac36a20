use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Installs the global Prometheus recorder on first use. Every later caller
/// shares the same handle.
fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        })
        .clone()
}

pub struct MetricsService {
    handle: Option<PrometheusHandle>,
}

impl MetricsService {
    pub fn new() -> Self {
        Self {
            handle: prometheus_handle(),
        }
    }

    pub fn record_upload(&self, extension: &str) {
        counter!("uploads_total", "extension" => extension.to_string()).increment(1);
    }

    pub fn record_job(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        counter!("jobs_processed_total", "outcome" => outcome).increment(1);
    }

    pub fn record_expired_job(&self) {
        counter!("jobs_expired_total").increment(1);
    }

    pub fn record_error(&self, error_type: &str) {
        counter!("errors_total", "type" => error_type.to_string()).increment(1);
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(|h| h.render())
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RequestTimer {
    start: Instant,
    endpoint: String,
}

impl RequestTimer {
    pub fn new(endpoint: String) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        histogram!("request_duration_seconds", "endpoint" => self.endpoint.clone())
            .record(duration.as_secs_f64());
    }
}
