//! Error types for the discovery subsystem.

use healer_core::HealerError;
use thiserror::Error;

/// Errors that can occur while loading directory definitions or discovering healers.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Directory definition not found
    #[error("directory definition not found: {directory_id}")]
    NotFound {
        /// The directory ID that was not found
        directory_id: String,
    },

    /// Failed to read a directory definition file
    #[error("failed to load directory definition from {path}: {source}")]
    LoadError {
        /// Path to the definition file
        path: String,
        /// Underlying error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse directory definition TOML
    #[error("failed to parse directory definition TOML in {path}: {source}")]
    ParseError {
        /// Path to the definition file
        path: String,
        /// TOML parse error
        #[source]
        source: toml::de::Error,
    },

    /// Invalid directory definition (validation failed)
    #[error("invalid directory definition for {directory_id}: {reason}")]
    ValidationError {
        /// Directory ID being validated
        directory_id: String,
        /// Reason for validation failure
        reason: String,
    },

    /// Definitions directory not found
    #[error("directory definitions not found at {path}")]
    DirectoryNotFound {
        /// Expected directory path
        path: String,
    },

    /// The site served a block or captcha page
    #[error("blocked by {platform}: {reason}")]
    Blocked {
        /// Platform tag of the source
        platform: String,
        /// What gave the block away
        reason: String,
    },

    /// Page fetch or browser failure
    #[error(transparent)]
    Fetch(#[from] HealerError),

    /// Browser could not be launched
    #[error("browser error: {0}")]
    Browser(#[from] healer_browser::BrowserError),

    /// I/O error while accessing definitions
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    /// Whether the site has started refusing us.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. } | Self::Fetch(HealerError::Blocked(_)))
    }
}

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_detection() {
        let blocked = DiscoveryError::Blocked {
            platform: "instagram".to_string(),
            reason: "captcha".to_string(),
        };
        assert!(blocked.is_blocked());
        assert_eq!(blocked.to_string(), "blocked by instagram: captcha");

        let http_blocked = DiscoveryError::from(HealerError::Blocked("HTTP 429".to_string()));
        assert!(http_blocked.is_blocked());

        let network = DiscoveryError::from(HealerError::Network("timeout".to_string()));
        assert!(!network.is_blocked());
    }
}
