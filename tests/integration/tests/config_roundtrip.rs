//! Config save/load roundtrip integration tests.
//!
//! These tests verify that configuration can be serialized, written to disk,
//! and loaded back with identical field values.

use devrig_core::config::{Config, LogFormat, LogLevel};
use devrig_core::ConfigError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devrig.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.process.kill_grace_ms, 5_000);
    assert_eq!(loaded.secrets.kdf, config.secrets.kdf);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("devrig.json5");

    let mut config = Config::default();
    config.secrets.dir = Some(PathBuf::from("/var/lib/devrig/secrets"));
    config.process.timeout_secs = Some(90);
    config.stream.max_frame_bytes = Some(1 << 20);
    config.logging.level = LogLevel::Debug;
    config.logging.format = LogFormat::Json;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
    loaded.validate().unwrap();
}

#[test]
fn test_handwritten_json5_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devrig.json5");
    std::fs::write(
        &path,
        r#"{
            // comments and trailing commas are fine
            process: { kill_grace_ms: 250, },
            logging: { level: "info", format: "json" },
        }"#,
    )
    .unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.process.kill_grace_ms, 250);
    assert_eq!(loaded.process.max_output_bytes, Config::default().process.max_output_bytes);
    assert_eq!(loaded.logging.level, LogLevel::Info);
    assert_eq!(loaded.logging.format, LogFormat::Json);
}

#[test]
fn test_invalid_values_fail_validation() {
    let mut config = Config::default();
    config.secrets.kdf.iterations = 0;
    config.process.max_output_bytes = 0;

    match config.validate() {
        Err(ConfigError::Validation(msg)) => {
            assert!(msg.contains("iterations"), "{msg}");
            assert!(msg.contains("max_output_bytes"), "{msg}");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/devrig.json5"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_config_load_or_default_when_missing() {
    let dir = TempDir::new().unwrap();
    let loaded = Config::load_or_default(&dir.path().join("absent.json5")).unwrap();
    assert_eq!(loaded.process.kill_grace_ms, Config::default().process.kill_grace_ms);
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
