//! Extraction error types.

use thiserror::Error;

/// Errors raised while extracting contact details.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The page URL could not be parsed.
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        /// The offending input
        url: String,
        /// Parser error
        source: url::ParseError,
    },

    /// The page could not be fetched.
    #[error("fetch failed: {0}")]
    Fetch(#[from] healer_core::HealerError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
