//! Child process environment.
//!
//! The child inherits the host environment, gains the variables an
//! interactive shell expects, and gets common tool directories appended to
//! `PATH` so binaries installed by package managers resolve even when the
//! app was launched from a GUI with a minimal environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Always exported as `TERM`, whatever the host or overrides say.
pub const FORCED_TERM: &str = "xterm-256color";

/// `LANG` used when the host does not set one.
pub const DEFAULT_LANG: &str = "en_US.UTF-8";

/// Flags that make common CLIs emit color without a real TTY check.
const COLOR_FLAGS: &[(&str, &str)] = &[
    ("CLICOLOR", "1"),
    ("CLICOLOR_FORCE", "1"),
    ("FORCE_COLOR", "1"),
    ("COLORTERM", "truecolor"),
];

#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

/// An environment being assembled for one child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnvironment {
    vars: BTreeMap<String, String>,
}

impl ChildEnvironment {
    /// Start from the current process environment.
    pub fn from_host() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    fn set_if_missing(&mut self, key: &str, value: impl FnOnce() -> Option<String>) {
        if self.get(key).map_or(true, str::is_empty) {
            if let Some(v) = value() {
                self.vars.insert(key.to_string(), v);
            }
        }
    }

    /// Fill in what an interactive shell needs. Host values win except for
    /// the color flags, which are always forced.
    pub fn with_shell_defaults(mut self, shell: &str) -> Self {
        self.set_if_missing("HOME", || {
            dirs::home_dir().map(|p| p.to_string_lossy().into_owned())
        });
        let fallback_user = self
            .get("LOGNAME")
            .or_else(|| self.get("USERNAME"))
            .map(str::to_string);
        self.set_if_missing("USER", || fallback_user);
        self.set_if_missing("SHELL", || Some(shell.to_string()));
        self.set_if_missing("LANG", || Some(DEFAULT_LANG.to_string()));
        for (key, value) in COLOR_FLAGS {
            self.set(*key, *value);
        }
        self
    }

    /// Apply caller-supplied variables over everything else.
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in overrides {
            self.set(k, v);
        }
        self
    }

    /// Append `dirs` to `PATH`, skipping any already present. A leading
    /// `~/` expands against this environment's `HOME`.
    pub fn with_path_dirs<S: AsRef<str>>(mut self, dirs: &[S]) -> Self {
        let home = self.get("HOME").map(PathBuf::from);
        let mut entries: Vec<String> = self
            .get("PATH")
            .map(|p| {
                p.split(PATH_SEPARATOR)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        for dir in dirs {
            let expanded = expand_home(dir.as_ref(), home.as_deref());
            if !entries.iter().any(|e| e == &expanded) {
                entries.push(expanded);
            }
        }

        let sep = PATH_SEPARATOR.to_string();
        self.set("PATH", entries.join(&sep));
        self
    }

    /// `PATH` split into its entries.
    pub fn path_entries(&self) -> Vec<&str> {
        self.get("PATH")
            .map(|p| p.split(PATH_SEPARATOR).filter(|e| !e.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Final variable list, with `TERM` forced last.
    pub fn into_vars(mut self) -> Vec<(String, String)> {
        self.set("TERM", FORCED_TERM);
        self.vars.into_iter().collect()
    }
}

fn expand_home(dir: &str, home: Option<&Path>) -> String {
    match (dir.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => dir.to_string(),
    }
}

/// Environment for a child launched from this process.
pub fn build_child_env<S, I, K, V>(shell: &str, extra_path: &[S], overrides: I) -> Vec<(String, String)>
where
    S: AsRef<str>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    ChildEnvironment::from_host()
        .with_shell_defaults(shell)
        .with_overrides(overrides)
        .with_path_dirs(extra_path)
        .into_vars()
}
