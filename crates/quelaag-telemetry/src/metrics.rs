//! Prometheus metrics for Quelaag.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `quelaag_dispatch_total` | Counter | `route` | Dispatch cycles by selected route |
//! | `quelaag_dispatch_errors_total` | Counter | `entry`, `phase`, `outcome` | Entry failures and who handled them |
//! | `quelaag_requests_total` | Counter | `method`, `status` | HTTP requests served |
//! | `quelaag_request_duration_seconds` | Histogram | `method` | HTTP request latency |
//! | `quelaag_in_flight_requests` | Gauge | - | HTTP requests being processed |
//!
//! Recording functions are safe to call before [`init_metrics`]; without an
//! installed recorder they do nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use quelaag_telemetry::metrics::{record_dispatch, record_request};
//!
//! record_dispatch("endpoint");
//! record_request("GET", 200, Duration::from_millis(3));
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Path the HTTP server exposes the rendered metrics on.
    pub path: String,

    /// Value of the `service` label attached to every metric.
    pub service_name: String,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
            service_name: "quelaag".to_string(),
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Handle on the installed Prometheus recorder.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Wraps an installed recorder handle.
    #[must_use]
    pub fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Returns the registry of the globally installed recorder, if any.
    #[must_use]
    pub fn global() -> Option<Self> {
        METRICS_HANDLE.get().cloned().map(Self::new)
    }

    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the global Prometheus recorder.
///
/// Calling this again after a successful install is a no-op.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidBuckets` for unusable buckets and
/// `TelemetryError::MetricsInit` if another recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled || METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .add_global_label("service", config.service_name.clone())
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidBuckets(e.to_string()))?;

    let handle = builder
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "quelaag_dispatch_total",
        "Total dispatch cycles by selected route"
    );
    describe_counter!(
        "quelaag_dispatch_errors_total",
        "Failures raised by endpoints, observers and fallbacks"
    );
    describe_counter!("quelaag_requests_total", "Total HTTP requests served");
    describe_histogram!(
        "quelaag_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "quelaag_in_flight_requests",
        "Number of HTTP requests currently being processed"
    );
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Records a dispatch cycle.
///
/// `route` is the selected route kind (`endpoint`, `sub_route`, `fallback`,
/// `none`) or `error` when endpoint selection itself failed.
pub fn record_dispatch(route: &str) {
    counter!("quelaag_dispatch_total", "route" => route.to_string()).increment(1);
}

/// Records an entry failure.
///
/// `outcome` names who handled it: `entry`, `global` or `unhandled`.
pub fn record_dispatch_error(entry: &str, phase: &str, outcome: &str) {
    counter!(
        "quelaag_dispatch_errors_total",
        "entry" => entry.to_string(),
        "phase" => phase.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Records a served HTTP request.
pub fn record_request(method: &str, status_code: u16, duration: Duration) {
    counter!(
        "quelaag_requests_total",
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "quelaag_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Guard that tracks one in-flight request.
///
/// Increments `quelaag_in_flight_requests` on creation and decrements it on
/// drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("quelaag_in_flight_requests").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("quelaag_in_flight_requests").decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.path, "/metrics");
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_dispatch("endpoint");
        record_dispatch_error("observer", "action", "unhandled");
        record_request("GET", 200, Duration::from_millis(10));
        let guard = InFlightGuard::new();
        drop(guard);
    }

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let config = MetricsConfig {
            duration_buckets: Vec::new(),
            ..Default::default()
        };
        // An already installed recorder short-circuits before validation.
        if METRICS_HANDLE.get().is_none() {
            assert!(matches!(
                init_metrics(&config),
                Err(TelemetryError::InvalidBuckets(_))
            ));
        }
    }
}
