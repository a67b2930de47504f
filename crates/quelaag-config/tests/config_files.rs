//! Loading configuration from files on disk.

use std::io::Write;

use quelaag_config::{ConfigError, ConfigLoader, LogFormat, PredicateFailureMode};
use quelaag_router::PredicateFailure;

fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_complete_toml_file() {
    let file = write_file(
        ".toml",
        r#"
            [server]
            http_addr = "127.0.0.1:7000"
            response_timeout_ms = 500
            not_found_status = 410

            [dispatch]
            catch_panics = false
            on_predicate_failure = "continue"

            [telemetry]
            service_name = "orders"

            [telemetry.logging]
            level = "warn"
            format = "pretty"

            [telemetry.metrics]
            enabled = false
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.server.http_addr, "127.0.0.1:7000");
    assert_eq!(config.server.response_timeout_ms, 500);
    assert_eq!(config.server.not_found_status, 410);
    assert_eq!(config.server.shutdown_timeout_secs, 30);
    assert_eq!(config.dispatch.on_predicate_failure, PredicateFailureMode::Continue);
    assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);

    let options = config.dispatch.to_options();
    assert!(!options.catch_panics);
    assert_eq!(options.on_predicate_failure, PredicateFailure::Continue);

    let telemetry = config.telemetry.to_telemetry_config();
    assert_eq!(telemetry.metrics.service_name, "orders");
    assert!(!telemetry.metrics.enabled);
}

#[test]
fn test_json_file() {
    let file = write_file(".json", r#"{"dispatch": {"log_unhandled": false}}"#);
    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert!(!config.dispatch.log_unhandled);
    assert!(config.dispatch.catch_panics);
}

#[test]
fn test_unknown_field_in_file() {
    let file = write_file(".toml", "[server]\nhttp2_enabled = true\n");
    assert!(matches!(
        ConfigLoader::new().with_file(file.path()),
        Err(ConfigError::TomlError(_))
    ));
}

#[test]
fn test_unsupported_extension() {
    let file = write_file(".yaml", "server: {}\n");
    assert!(matches!(
        ConfigLoader::new().with_file(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_file_values_are_validated() {
    let file = write_file(".toml", "[server]\nhttp_addr = \"nowhere\"\n");
    let result = ConfigLoader::new().with_file(file.path()).unwrap().load();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
