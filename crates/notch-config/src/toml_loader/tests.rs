//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::NotchConfig;
use notch_common::{BackendKind, ConfigError};
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_notch_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[terminal]
backend = "http_bridge"
rows = 40

[shell]
program = "/bin/bash"
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.terminal.backend, BackendKind::HttpBridge);
    assert_eq!(config.terminal.rows, 40);
    assert_eq!(config.shell.program, "/bin/bash");
    // Defaults preserved
    assert_eq!(config.terminal.cols, 80);
    assert_eq!(config.bridge.program, "ttyd");
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_out_of_range_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[bridge]\nport_range = 0\nprogram = \"gotty\"\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.bridge.port_range, NotchConfig::default().bridge.port_range);
    assert_eq!(config.bridge.program, "ttyd");
}

#[test]
fn create_default_config_writes_parseable_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.terminal.backend, BackendKind::DirectPipe);
    assert_eq!(config.terminal.history_capacity, 100);
}

#[test]
fn default_config_path_ends_with_notch_config() {
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("notch/config.toml"));
    }
}
