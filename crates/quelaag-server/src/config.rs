//! Server configuration.
//!
//! ```rust
//! use quelaag_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:8080")
//!     .response_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:8080");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use http::StatusCode;
use quelaag_config::QuelaagConfig;

/// Default bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default response timeout.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 30_000;

/// Default graceful shutdown timeout.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    response_timeout: Duration,
    shutdown_timeout: Duration,
    not_found_status: StatusCode,
    max_body_bytes: usize,
    metrics_path: Option<String>,
}

impl ServerConfig {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// How long a request may wait for its response.
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// How long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Status sent when dispatch finishes without a response.
    #[must_use]
    pub fn not_found_status(&self) -> StatusCode {
        self.not_found_status
    }

    /// Largest accepted request body.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Path answered with Prometheus metrics, if any.
    #[must_use]
    pub fn metrics_path(&self) -> Option<&str> {
        self.metrics_path.as_deref()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&QuelaagConfig> for ServerConfig {
    fn from(config: &QuelaagConfig) -> Self {
        let server = &config.server;
        let metrics = &config.telemetry.metrics;
        Self::builder()
            .http_addr(server.http_addr.clone())
            .response_timeout(Duration::from_millis(server.response_timeout_ms))
            .shutdown_timeout(Duration::from_secs(server.shutdown_timeout_secs))
            .not_found_status(
                StatusCode::from_u16(server.not_found_status).unwrap_or(StatusCode::NOT_FOUND),
            )
            .max_body_bytes(server.max_body_bytes)
            .metrics_path(metrics.enabled.then(|| metrics.path.clone()))
            .build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            config: ServerConfig {
                http_addr: DEFAULT_HTTP_ADDR.to_string(),
                response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
                shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
                not_found_status: StatusCode::NOT_FOUND,
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
                metrics_path: None,
            },
        }
    }
}

impl ServerConfigBuilder {
    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets the response timeout.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Sets the status sent when no response was produced.
    #[must_use]
    pub fn not_found_status(mut self, status: StatusCode) -> Self {
        self.config.not_found_status = status;
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    /// Sets the metrics path; `None` disables it.
    #[must_use]
    pub fn metrics_path(mut self, path: Option<String>) -> Self {
        self.config.metrics_path = path;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.not_found_status(), StatusCode::NOT_FOUND);
        assert!(config.metrics_path().is_none());
    }

    #[test]
    fn test_from_quelaag_config() {
        let mut source = QuelaagConfig::default();
        source.server.http_addr = "127.0.0.1:9999".to_string();
        source.server.not_found_status = 410;
        source.server.response_timeout_ms = 250;

        let config = ServerConfig::from(&source);
        assert_eq!(config.http_addr(), "127.0.0.1:9999");
        assert_eq!(config.not_found_status(), StatusCode::GONE);
        assert_eq!(config.response_timeout(), Duration::from_millis(250));
        assert_eq!(config.metrics_path(), Some("/metrics"));

        source.telemetry.metrics.enabled = false;
        assert!(ServerConfig::from(&source).metrics_path().is_none());
    }

    #[test]
    fn test_invalid_socket_addr() {
        let config = ServerConfig::builder().http_addr("nowhere").build();
        assert!(config.socket_addr().is_err());
    }
}
