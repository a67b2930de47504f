//! Typed configuration for Quelaag services.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`QUELAAG__SECTION__KEY`), optionally from `.env`
//! - Strict parsing: unknown fields are rejected
//!
//! [`QuelaagConfig`] holds three sections:
//!
//! - [`ServerConfig`]: HTTP transport (bind address, timeouts, no-response status)
//! - [`DispatchConfig`]: dispatcher switches, convertible into
//!   [`DispatchOptions`](quelaag_router::DispatchOptions)
//! - [`TelemetryConfigSection`]: logging and metrics, convertible into
//!   [`TelemetryConfig`](quelaag_telemetry::TelemetryConfig)
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! response_timeout_ms = 30000
//! shutdown_timeout_secs = 30
//! not_found_status = 404
//!
//! [dispatch]
//! catch_panics = true
//! log_unhandled = true
//! on_predicate_failure = "stop"
//!
//! [telemetry]
//! service_name = "orders"
//!
//! [telemetry.logging]
//! level = "info,quelaag_router=debug"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! path = "/metrics"
//! ```

#![doc(html_root_url = "https://docs.rs/quelaag-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{QuelaagConfig, QuelaagConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
