//! Child process environment settings.

use serde::{Deserialize, Serialize};

/// Directories appended to the child's `PATH` when missing from it.
///
/// GUI-launched apps often inherit a bare `PATH`, so package-manager and
/// toolchain directories are added back. Entries starting with `~/` are
/// expanded against the child's `HOME`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub extra_path: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            extra_path: [
                "/opt/homebrew/bin",
                "/opt/homebrew/sbin",
                "/usr/local/bin",
                "/usr/local/sbin",
                "/usr/bin",
                "/bin",
                "/usr/sbin",
                "/sbin",
                "~/.cargo/bin",
                "~/.local/bin",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
