//! Configuration types deserialized from `hdlvm.toml`.

use crate::duration::Duration;
use serde::Deserialize;

/// The top-level run configuration parsed from `hdlvm.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HdlvmConfig {
    /// Scheduler limits and stop time.
    #[serde(default)]
    pub sim: SimSection,
    /// Logging defaults.
    #[serde(default)]
    pub log: LogSection,
    /// Clock generators installed before the run.
    #[serde(default)]
    pub clocks: Vec<ClockConfig>,
    /// Timed drives installed before the run.
    #[serde(default)]
    pub stimulus: Vec<StimulusConfig>,
}

/// The `[sim]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimSection {
    /// When the run ends. `hdlvm run --stop` overrides it.
    pub stop_time: Option<Duration>,
    /// Maximum delta cycles at one timestamp.
    #[serde(default = "default_max_deltas")]
    pub max_deltas: u32,
    /// Maximum instructions a process may execute per resume.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    /// Fold the clock-edge idiom into a single jump.
    #[serde(default = "default_true")]
    pub fold_rising_edges: bool,
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            stop_time: None,
            max_deltas: default_max_deltas(),
            max_steps: default_max_steps(),
            fold_rising_edges: true,
        }
    }
}

fn default_max_deltas() -> u32 {
    10_000
}

fn default_max_steps() -> u64 {
    1_000_000
}

fn default_true() -> bool {
    true
}

/// The `[log]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Default level when neither `RUST_LOG` nor `-v`/`-q` is given.
    #[serde(default)]
    pub level: LogLevel,
}

/// Log verbosity.
#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Errors and warnings.
    Warn,
    /// Milestones (default).
    #[default]
    Info,
    /// Scheduler and optimizer detail.
    Debug,
    /// Every signal change and instruction.
    Trace,
}

impl LogLevel {
    /// The filter directive for this level.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// One `[[clocks]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    /// Driven signal.
    pub signal: String,
    /// Time spent at `'1'`.
    pub high: Duration,
    /// Time spent at `'0'`.
    pub low: Duration,
}

/// One `[[stimulus]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StimulusConfig {
    /// Driven signal.
    pub signal: String,
    /// Absolute time of the drive.
    pub at: Duration,
    /// Value literal, interpreted against the signal's declared type.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn log_level_all_variants() {
        for (input, expected) in [
            ("error", LogLevel::Error),
            ("warn", LogLevel::Warn),
            ("info", LogLevel::Info),
            ("debug", LogLevel::Debug),
            ("trace", LogLevel::Trace),
        ] {
            let toml = format!("[log]\nlevel = \"{input}\"\n");
            let config = load_config_from_str(&toml).unwrap();
            assert_eq!(config.log.level, expected);
            assert_eq!(expected.as_str(), input);
        }
    }

    #[test]
    fn duration_accepts_integer_femtoseconds() {
        let config = load_config_from_str("[sim]\nstop_time = 2500\n").unwrap();
        assert_eq!(config.sim.stop_time, Some(Duration(2500)));
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(load_config_from_str("[sim]\nstop = \"1 ns\"\n").is_err());
        assert!(load_config_from_str("[waves]\nformat = \"vcd\"\n").is_err());
    }
}
