//! Configuration file loading for the panmeter binary

use panmeter::config::{MeterConfig, CONFIG_ENV_VAR};
use panmeter::{AccumulationScope, EngineConfig, Error};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
#[serial]
fn test_explicit_config_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("meter.toml");
    fs::write(
        &path,
        r#"
[analysis]
window_seconds = 0.1
floor_db = -90.0
scope = "whole_stream"

[playback]
enabled = false
ring_frames = 4096

[display]
bar_width = 20

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let (config, used) = MeterConfig::load(Some(&path)).unwrap();

    assert_eq!(used.path(), Some(path.as_path()));
    assert_eq!(config.engine_config(), EngineConfig::whole_file());
    assert!(!config.playback.enabled);
    assert_eq!(config.playback.ring_frames, 4096);
    assert_eq!(config.display.bar_width, 20);
    assert_eq!(config.display.refresh_ms, 50);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = MeterConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_var_names_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("env.toml");
    fs::write(&path, "[analysis]\nscope = \"whole_stream\"\n").unwrap();

    std::env::set_var(CONFIG_ENV_VAR, &path);
    let result = MeterConfig::load(None);
    std::env::remove_var(CONFIG_ENV_VAR);

    let (config, used) = result.unwrap();
    assert_eq!(used.path(), Some(path.as_path()));
    assert_eq!(config.analysis.scope, AccumulationScope::WholeStream);
}

#[test]
#[serial]
fn test_invalid_values_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[analysis]\nwindow_seconds = -1.0\n").unwrap();

    let result = MeterConfig::load(Some(&path));
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("window_seconds")));
}

#[test]
#[serial]
fn test_malformed_toml_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[analysis\nfloor_db = ").unwrap();

    match MeterConfig::load(Some(&path)) {
        Err(Error::Config(msg)) => assert!(msg.contains("broken.toml"), "{}", msg),
        other => panic!("expected config error, got {:?}", other),
    }
}
