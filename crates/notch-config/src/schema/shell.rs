//! Shell process configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shell process settings for the direct-pipe backend.
///
/// Controls which shell to launch, its arguments, working directory,
/// extra environment variables, and login shell behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell program path. Empty string means auto-detect from `$SHELL`.
    pub program: String,
    /// Extra arguments passed to the shell.
    pub args: Vec<String>,
    /// Initial working directory. `None` means inherit from parent.
    pub working_directory: Option<String>,
    /// Extra environment variables injected into the shell.
    pub env: HashMap<String, String>,
    /// Pass `-l` so profile files are sourced.
    pub login_shell: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            working_directory: None,
            env: HashMap::new(),
            login_shell: true,
        }
    }
}

impl ShellConfig {
    /// The configured program, or the user's default shell.
    pub fn resolved_program(&self) -> String {
        if self.program.is_empty() {
            default_shell()
        } else {
            self.program.clone()
        }
    }

    /// Arguments for an interactive session: `-l` first when enabled,
    /// then any configured extras.
    pub fn interactive_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        if self.login_shell && !self.args.iter().any(|a| a == "-l" || a == "--login") {
            args.push("-l".to_string());
        }
        args.extend(self.args.iter().cloned());
        args
    }
}

/// Get the user's default shell.
///
/// - Unix: reads `$SHELL`, falls back to `/bin/zsh` on macOS and `/bin/sh`
///   elsewhere
/// - Windows: reads `$COMSPEC`, falls back to `cmd.exe`
pub fn default_shell() -> String {
    #[cfg(target_os = "macos")]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/zsh".to_string())
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
    #[cfg(windows)]
    {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
