//! Root configuration type.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DispatchConfig, LogFormat, ServerConfig, TelemetryConfigSection};

/// Complete Quelaag service configuration.
///
/// # Example
///
/// ```
/// use quelaag_config::QuelaagConfig;
///
/// let config = QuelaagConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.dispatch.catch_panics);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct QuelaagConfig {
    /// HTTP transport settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dispatcher behavior.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,
}

impl QuelaagConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use quelaag_config::{QuelaagConfig, ServerConfig};
    ///
    /// let config = QuelaagConfig::builder()
    ///     .server(ServerConfig {
    ///         http_addr: "127.0.0.1:3000".to_string(),
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    #[must_use]
    pub fn builder() -> QuelaagConfigBuilder {
        QuelaagConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if !(100..=599).contains(&self.server.not_found_status) {
            return Err(ConfigError::invalid_value(
                "server.not_found_status",
                format!("not an HTTP status code: {}", self.server.not_found_status),
            ));
        }

        if self.server.response_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.response_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.telemetry.logging.enabled
            && quelaag_telemetry::logging::create_env_filter(&self.telemetry.logging.level).is_err()
        {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                format!("invalid filter directive: {}", self.telemetry.logging.level),
            ));
        }

        if self.telemetry.metrics.enabled {
            if !self.telemetry.metrics.path.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.path",
                    "must start with '/'",
                ));
            }
            if self.telemetry.metrics.histogram_buckets.is_empty() {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.histogram_buckets",
                    "must not be empty",
                ));
            }
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs, metrics off.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.telemetry.metrics.enabled = false;
        config
    }

    /// Production preset: JSON logs at info, metrics on.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Builder for [`QuelaagConfig`].
#[derive(Debug, Default)]
pub struct QuelaagConfigBuilder {
    config: QuelaagConfig,
}

impl QuelaagConfigBuilder {
    /// Creates a builder holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Sets the dispatch section.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.config.dispatch = dispatch;
        self
    }

    /// Sets the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfigSection) -> Self {
        self.config.telemetry = telemetry;
        self
    }

    /// Builds the configuration without validating it.
    #[must_use]
    pub fn build(self) -> QuelaagConfig {
        self.config
    }
}
