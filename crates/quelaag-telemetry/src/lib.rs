//! Observability for Quelaag services.
//!
//! - **Logging**: structured JSON or pretty logs via `tracing-subscriber`
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//!
//! Every dispatch cycle opens a `dispatch` span carrying a `dispatch_id`
//! field, so log lines from predicates, handlers and background completions
//! of one request correlate.
//!
//! # Example
//!
//! ```rust,ignore
//! use quelaag_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("orders")
//!     .log_level("info,quelaag_router=debug")
//!     .build();
//! init_telemetry(&config)?;
//! ```
//!
//! # Metrics Endpoint
//!
//! ```text
//! # TYPE quelaag_dispatch_total counter
//! quelaag_dispatch_total{service="orders",route="endpoint"} 1234
//! quelaag_dispatch_total{service="orders",route="fallback"} 56
//! ```

#![doc(html_root_url = "https://docs.rs/quelaag-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{fields, init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, InFlightGuard, MetricsConfig, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging and metrics.
///
/// # Errors
///
/// Returns the first initialization failure.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    logging::init_logging(&config.logging)?;
    metrics::init_metrics(&config.metrics)?;
    tracing::debug!(
        service = %config.metrics.service_name,
        metrics = config.metrics.enabled,
        "telemetry initialized"
    );
    Ok(())
}
