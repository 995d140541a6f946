//! Terminal-over-HTTP bridge settings.

use serde::{Deserialize, Serialize};

/// Placeholder in [`BridgeConfig::args`] replaced by the allocated port.
pub const PORT_PLACEHOLDER: &str = "{port}";

/// Placeholder in [`BridgeConfig::args`] replaced by the resolved shell.
pub const SHELL_PLACEHOLDER: &str = "{shell}";

/// How the http-bridge backend launches and reaches its server.
///
/// The server is a third-party program (ttyd by default) serving a terminal
/// over HTTP on `127.0.0.1:<port>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub program: String,
    /// Argument template; `{port}` and `{shell}` are substituted at launch.
    pub args: Vec<String>,
    /// First port probed (valid range: 1024-65535).
    pub port_start: u16,
    /// Number of consecutive ports probed (valid range: 1-1000).
    pub port_range: u16,
    /// Wait before the first reachability check, in milliseconds.
    pub grace_period_ms: u32,
    /// Fixed delay between reachability checks, in milliseconds.
    pub retry_interval_ms: u32,
    /// Reachability checks before the session is marked failed (valid range: 1-1000).
    pub max_attempts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: "ttyd".into(),
            args: vec![
                "--port".into(),
                PORT_PLACEHOLDER.into(),
                "--interface".into(),
                "127.0.0.1".into(),
                "--writable".into(),
                SHELL_PLACEHOLDER.into(),
            ],
            port_start: 7681,
            port_range: 10,
            grace_period_ms: 1_000,
            retry_interval_ms: 2_000,
            max_attempts: 30,
        }
    }
}

impl BridgeConfig {
    /// Expand the argument template for one launch.
    pub fn render_args(&self, port: u16, shell: &str) -> Vec<String> {
        let port = port.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(PORT_PLACEHOLDER, &port)
                    .replace(SHELL_PLACEHOLDER, shell)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_config_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.program, "ttyd");
        assert_eq!(config.port_start, 7681);
        assert_eq!(config.port_range, 10);
        assert_eq!(config.grace_period_ms, 1_000);
        assert_eq!(config.retry_interval_ms, 2_000);
        assert_eq!(config.max_attempts, 30);
    }

    #[test]
    fn render_args_substitutes_placeholders() {
        let config = BridgeConfig::default();
        let args = config.render_args(7683, "/bin/zsh");
        assert_eq!(
            args,
            vec!["--port", "7683", "--interface", "127.0.0.1", "--writable", "/bin/zsh"]
        );
    }

    #[test]
    fn render_args_handles_embedded_placeholder() {
        let config = BridgeConfig {
            args: vec!["--listen=127.0.0.1:{port}".into()],
            ..BridgeConfig::default()
        };
        assert_eq!(config.render_args(9000, "sh"), vec!["--listen=127.0.0.1:9000"]);
    }

    #[test]
    fn bridge_config_partial_toml() {
        let config: BridgeConfig = toml::from_str("program = \"gotty\"\nport_start = 8080\n").unwrap();
        assert_eq!(config.program, "gotty");
        assert_eq!(config.port_start, 8080);
        assert_eq!(config.max_attempts, 30);
    }
}
