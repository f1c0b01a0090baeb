//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating an `hdlvm.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A duration string with a bad number or unit.
    #[error("invalid duration '{0}' (use a whole number followed by fs, ps, ns, us, ms or s)")]
    InvalidDuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("sim.stop_time".to_string());
        assert_eq!(format!("{err}"), "missing required field: sim.stop_time");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("sim.max_deltas must be positive".to_string());
        assert_eq!(
            format!("{err}"),
            "validation error: sim.max_deltas must be positive"
        );
    }

    #[test]
    fn display_invalid_duration() {
        let err = ConfigError::InvalidDuration("10 parsecs".to_string());
        assert!(format!("{err}").starts_with("invalid duration '10 parsecs'"));
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        let display = format!("{err}");
        assert!(display.starts_with("failed to read configuration:"));
    }
}
