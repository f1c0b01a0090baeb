//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::HdlvmConfig;
use std::collections::HashSet;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE: &str = "hdlvm.toml";

/// Loads and validates `hdlvm.toml` from a directory.
pub fn load_config(dir: &Path) -> Result<HdlvmConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file.
pub fn load_config_file(path: &Path) -> Result<HdlvmConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<HdlvmConfig, ConfigError> {
    let config: HdlvmConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks limits are usable and every clock and drive names a signal.
fn validate_config(config: &HdlvmConfig) -> Result<(), ConfigError> {
    if config.sim.max_deltas == 0 {
        return Err(ConfigError::ValidationError(
            "sim.max_deltas must be positive".to_string(),
        ));
    }
    if config.sim.max_steps == 0 {
        return Err(ConfigError::ValidationError(
            "sim.max_steps must be positive".to_string(),
        ));
    }

    let mut clocked = HashSet::new();
    for (i, clock) in config.clocks.iter().enumerate() {
        if clock.signal.is_empty() {
            return Err(ConfigError::MissingField(format!("clocks[{i}].signal")));
        }
        if clock.high.fs() == 0 || clock.low.fs() == 0 {
            return Err(ConfigError::ValidationError(format!(
                "clock '{}' needs non-zero high and low times",
                clock.signal
            )));
        }
        if !clocked.insert(clock.signal.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "signal '{}' has more than one clock",
                clock.signal
            )));
        }
    }

    for (i, drive) in config.stimulus.iter().enumerate() {
        if drive.signal.is_empty() {
            return Err(ConfigError::MissingField(format!("stimulus[{i}].signal")));
        }
        if drive.value.is_empty() {
            return Err(ConfigError::MissingField(format!("stimulus[{i}].value")));
        }
        if clocked.contains(drive.signal.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "signal '{}' is both clocked and driven by stimulus",
                drive.signal
            )));
        }
    }
    Ok(())
}
