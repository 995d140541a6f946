//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log verbosity for the `notch` crates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive scoping the level to this workspace.
    pub fn directive(&self) -> String {
        format!("notch={}", self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_directive_scopes_to_notch() {
        let config = LoggingConfig {
            level: "debug".into(),
        };
        assert_eq!(config.directive(), "notch=debug");
        assert_eq!(LoggingConfig::default().directive(), "notch=info");
    }
}
