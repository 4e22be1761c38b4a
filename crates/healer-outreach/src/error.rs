//! Error types for outreach.

use healer_core::HealerError;
use thiserror::Error;

/// Errors raised while rendering or sending outreach mail.
#[derive(Error, Debug)]
pub enum OutreachError {
    /// Template missing or unreadable
    #[error("template error: {0}")]
    Template(String),

    /// A `{{token}}` the renderer does not know
    #[error("unknown placeholder '{{{{{token}}}}}' in template {template}")]
    UnknownPlaceholder {
        /// Template being rendered
        template: String,
        /// The unrecognized token
        token: String,
    },

    /// The mail relay refused or failed
    #[error("mail transport error: {0}")]
    Transport(String),

    /// Sender or recipient address does not parse
    #[error("invalid address: {0}")]
    Address(String),

    /// Store, settings or configuration failure
    #[error(transparent)]
    Core(#[from] HealerError),

    /// I/O error reading or writing templates
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for outreach operations.
pub type Result<T> = std::result::Result<T, OutreachError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_placeholder_message() {
        let err = OutreachError::UnknownPlaceholder {
            template: "initial_outreach".to_string(),
            token: "nickname".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown placeholder '{{nickname}}' in template initial_outreach"
        );
    }
}
