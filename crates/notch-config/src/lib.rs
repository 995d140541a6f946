//! Notch terminal configuration.
//!
//! TOML-based configuration for the embedded terminal panel. Every section
//! uses serde defaults so a partial (or missing) file works out of the box.
//!
//! ```rust,no_run
//! use notch_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{NotchConfig, CONFIG_SCHEMA_VERSION};

use notch_common::ConfigError;
use std::path::Path;

/// Load config from `path`, or from the platform default location.
///
/// The default location gets a commented template written on first run.
/// A file that parses but fails validation falls back to defaults (the
/// loader logs why); a file that does not parse is an error.
pub fn load_config(path: Option<&Path>) -> Result<NotchConfig, ConfigError> {
    let config = match path {
        Some(p) => toml_loader::load_from_path(p)?,
        None => toml_loader::load_default()?,
    };
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &NotchConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&NotchConfig::default());
        for section in ["terminal", "shell", "bridge", "environment", "logging"] {
            assert!(json.contains(&format!("\"{section}\"")), "missing {section}");
        }
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[terminal]\nbackend = \"http_bridge\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.terminal.backend, notch_common::BackendKind::HttpBridge);
    }

    #[test]
    fn load_config_missing_explicit_path_is_error() {
        let result = load_config(Some(Path::new("/tmp/notch_missing_config_4242.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
