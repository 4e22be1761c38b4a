use healer_core::HealerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("emergency stop: {reason}")]
    Emergency { reason: String },

    #[error("emergency stop is active: {reason}")]
    EmergencyStopActive { reason: String },

    #[error("email outreach is not enabled")]
    OutreachDisabled,

    #[error("Discovery error: {0}")]
    Discovery(#[from] healer_discovery::DiscoveryError),

    #[error("Extraction error: {0}")]
    Extract(#[from] healer_extract::ExtractError),

    #[error("Outreach error: {0}")]
    Outreach(#[from] healer_outreach::OutreachError),

    #[error("Export error: {0}")]
    Export(#[from] healer_export::ExportError),

    #[error("Database error: {0}")]
    Database(#[from] healer_db::DatabaseError),

    #[error(transparent)]
    Core(#[from] HealerError),
}

impl From<healer_core::ConfigError> for PipelineError {
    fn from(err: healer_core::ConfigError) -> Self {
        Self::Core(HealerError::Config(err))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Whether a failure means the platforms have noticed us and every further
/// action should stop.
#[must_use]
pub fn is_emergency_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit") || lower.contains("banned")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emergency_messages() {
        assert!(is_emergency_message("HTTP 429: Rate limit exceeded"));
        assert!(is_emergency_message("account banned"));
        assert!(!is_emergency_message("connection reset by peer"));
    }
}
