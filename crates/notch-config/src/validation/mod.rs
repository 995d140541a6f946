//! Full configuration validation.
//!
//! Checks numeric ranges and a few string constraints, collecting every
//! problem into a single `ConfigError` so the user sees them all at once.

mod helpers;


use crate::schema::NotchConfig;
use notch_common::ConfigError;

use helpers::validate_range;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &NotchConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_terminal(&mut errors, config);
    validate_bridge(&mut errors, config);
    validate_logging(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_terminal(errors: &mut Vec<String>, config: &NotchConfig) {
    let t = &config.terminal;
    validate_range(errors, "terminal.cols", u32::from(t.cols), 10, 500);
    validate_range(errors, "terminal.rows", u32::from(t.rows), 5, 500);
    validate_range(errors, "terminal.read_chunk_bytes", t.read_chunk_bytes, 512, 65_536);
    validate_range(errors, "terminal.history_capacity", t.history_capacity, 1, 10_000);
}

fn validate_bridge(errors: &mut Vec<String>, config: &NotchConfig) {
    let b = &config.bridge;
    if b.program.trim().is_empty() {
        errors.push("bridge.program must not be empty".into());
    }
    validate_range(errors, "bridge.port_start", u32::from(b.port_start), 1024, 65_535);
    validate_range(errors, "bridge.port_range", u32::from(b.port_range), 1, 1_000);
    validate_range(errors, "bridge.grace_period_ms", b.grace_period_ms, 0, 60_000);
    validate_range(errors, "bridge.retry_interval_ms", b.retry_interval_ms, 50, 60_000);
    validate_range(errors, "bridge.max_attempts", b.max_attempts, 1, 1_000);
}

fn validate_logging(errors: &mut Vec<String>, config: &NotchConfig) {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(format!(
            "logging.level = {:?} is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }
}
