//! Parsing and validation of `hdlvm.toml` run configuration files.
//!
//! This crate reads the run configuration and produces a strongly-typed
//! [`HdlvmConfig`]: stop time and scheduler limits, the default log level,
//! clock generators and timed stimulus.

#![warn(missing_docs)]

pub mod duration;
pub mod error;
pub mod loader;
pub mod types;

pub use duration::{parse_duration, Duration};
pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
