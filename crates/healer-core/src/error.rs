//! Core error types for the healer search pipeline.
//!
//! Subsystem crates define their own error enums; this one covers the shared
//! layers (configuration, stores, validation) and is what store trait
//! implementations return.

use thiserror::Error;

/// Central error type for shared pipeline operations.
#[derive(Error, Debug)]
pub enum HealerError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store errors (settings, counters, healer records)
    #[error("store error: {0}")]
    Store(String),

    /// A record with the same natural key already exists
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// Requested record does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    /// Network errors (HTTP requests, DNS, page fetches)
    #[error("network error: {0}")]
    Network(String),

    /// The remote site refused service (HTTP 429, ban page, captcha wall)
    #[error("blocked by {0}")]
    Blocked(String),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Outreach is enabled but mail credentials are missing
    #[error("email credentials not configured: set HEALER_SMTP_USER and HEALER_SMTP_PASS")]
    MissingCredentials,
}

/// Result type alias using `HealerError`.
pub type Result<T> = std::result::Result<T, HealerError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HealerError::Validation("invalid email".to_string());
        assert_eq!(err.to_string(), "validation error: invalid email");

        let err = ConfigError::NoConfigDir;
        assert_eq!(
            err.to_string(),
            "could not determine config directory (XDG base directories not available)"
        );
    }

    #[test]
    fn test_error_from_config() {
        let healer_err: HealerError = ConfigError::MissingCredentials.into();
        assert!(matches!(healer_err, HealerError::Config(_)));
        assert!(healer_err.to_string().contains("HEALER_SMTP_USER"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let healer_err: HealerError = io_err.into();
        assert!(matches!(healer_err, HealerError::Io(_)));
    }
}
