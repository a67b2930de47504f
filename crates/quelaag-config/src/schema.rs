//! Configuration schema types.
//!
//! Every section rejects unknown fields and fills missing ones with defaults.

use quelaag_router::{DispatchOptions, PredicateFailure};
use quelaag_telemetry::{LogConfig, MetricsConfig as TelemetryMetricsConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};

/// HTTP transport section.
///
/// # Example
///
/// ```
/// use quelaag_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.not_found_status, 404);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// How long a handler may take to respond, in milliseconds.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Status sent when dispatch finished without a response.
    #[serde(default = "default_not_found_status")]
    pub not_found_status: u16,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            response_timeout_ms: default_response_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            not_found_status: default_not_found_status(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_response_timeout() -> u64 {
    30_000
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_not_found_status() -> u16 {
    404
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Scanning policy after an endpoint predicate fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PredicateFailureMode {
    /// Select nothing.
    #[default]
    Stop,
    /// Evaluate the next endpoint.
    Continue,
}

impl From<PredicateFailureMode> for PredicateFailure {
    fn from(mode: PredicateFailureMode) -> Self {
        match mode {
            PredicateFailureMode::Stop => Self::Stop,
            PredicateFailureMode::Continue => Self::Continue,
        }
    }
}

/// Dispatcher behavior section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Route panics in callbacks like returned errors.
    #[serde(default = "default_true")]
    pub catch_panics: bool,

    /// Log failures that no error handler accepted.
    #[serde(default = "default_true")]
    pub log_unhandled: bool,

    /// What endpoint scanning does after a predicate fails.
    #[serde(default)]
    pub on_predicate_failure: PredicateFailureMode,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            log_unhandled: true,
            on_predicate_failure: PredicateFailureMode::Stop,
        }
    }
}

impl DispatchConfig {
    /// Converts the section into dispatcher options.
    #[must_use]
    pub fn to_options(&self) -> DispatchOptions {
        DispatchOptions {
            catch_panics: self.catch_panics,
            log_unhandled: self.log_unhandled,
            on_predicate_failure: self.on_predicate_failure.into(),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

impl From<LogFormat> for quelaag_telemetry::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g., "info", "quelaag_router=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable metrics collection.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path the server exposes Prometheus metrics on.
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Histogram bucket boundaries for request duration.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_histogram_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name attached to metrics.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl TelemetryConfigSection {
    /// Converts the section into the telemetry crate's configuration.
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        let pretty = self.logging.format == LogFormat::Pretty;
        TelemetryConfig {
            logging: LogConfig {
                enabled: self.logging.enabled,
                level: self.logging.level.clone(),
                format: self.logging.format.into(),
                span_events: pretty,
                file_line_info: self.logging.include_location,
                ..LogConfig::default()
            },
            metrics: TelemetryMetricsConfig {
                enabled: self.metrics.enabled,
                path: self.metrics.path.clone(),
                service_name: self.service_name.clone(),
                duration_buckets: self.metrics.histogram_buckets.clone(),
            },
        }
    }
}

fn default_service_name() -> String {
    "quelaag".to_string()
}

fn default_true() -> bool {
    true
}
