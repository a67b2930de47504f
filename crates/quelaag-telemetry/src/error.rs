//! Telemetry error types.

use thiserror::Error;

/// Failures while installing the log subscriber or the metrics recorder.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter was rejected or a global subscriber is already set.
    #[error("logging setup failed: {0}")]
    LoggingInit(String),

    /// The Prometheus recorder could not be installed.
    #[error("metrics recorder setup failed: {0}")]
    MetricsInit(String),

    /// Histogram buckets were empty or not usable.
    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit("directive `=x` is malformed".to_string());
        assert_eq!(err.to_string(), "logging setup failed: directive `=x` is malformed");

        let err = TelemetryError::InvalidBuckets("empty".to_string());
        assert_eq!(err.to_string(), "invalid histogram buckets: empty");
    }
}
