use std::fs;
use std::path::PathBuf;

use notch_common::PlatformError;

const APP_NAME: &str = "notch";

/// Platform configuration directory.
///
/// - macOS: `~/Library/Application Support/notch`
/// - Linux: `$XDG_CONFIG_HOME/notch` (defaults to `~/.config/notch`)
/// - Windows: `%APPDATA%\notch`
pub fn config_dir() -> Result<PathBuf, PlatformError> {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .ok_or_else(|| PlatformError::PathError("could not determine config directory".into()))
}

/// Platform data directory.
///
/// - macOS: `~/Library/Application Support/notch`
/// - Linux: `$XDG_DATA_HOME/notch` (defaults to `~/.local/share/notch`)
/// - Windows: `%APPDATA%\notch`
pub fn data_dir() -> Result<PathBuf, PlatformError> {
    dirs::data_dir()
        .map(|p| p.join(APP_NAME))
        .ok_or_else(|| PlatformError::PathError("could not determine data directory".into()))
}

/// Persisted terminal command history, `data_dir()/terminal_history.json`.
pub fn history_file() -> Result<PathBuf, PlatformError> {
    Ok(data_dir()?.join("terminal_history.json"))
}

/// Log directory, `data_dir()/logs`.
pub fn log_dir() -> Result<PathBuf, PlatformError> {
    Ok(data_dir()?.join("logs"))
}

/// Crash report directory, `log_dir()/crash-reports`.
pub fn crash_report_dir() -> Result<PathBuf, PlatformError> {
    Ok(log_dir()?.join("crash-reports"))
}

/// Create config, data, log and crash-report directories if missing.
pub fn ensure_dirs() -> Result<(), PlatformError> {
    for dir in [config_dir()?, data_dir()?, log_dir()?, crash_report_dir()?] {
        fs::create_dir_all(&dir).map_err(|e| {
            PlatformError::PathError(format!("failed to create {}: {e}", dir.display()))
        })?;
    }
    Ok(())
}
