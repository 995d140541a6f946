//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod bridge;
mod environment;
mod logging;
mod shell;
mod terminal;

pub use bridge::*;
pub use environment::*;
pub use logging::*;
pub use shell::*;
pub use terminal::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotchConfig {
    pub terminal: TerminalConfig,
    pub shell: ShellConfig,
    pub bridge: BridgeConfig,
    pub environment: EnvironmentConfig,
    pub logging: LoggingConfig,
}
