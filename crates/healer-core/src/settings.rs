//! Typed settings service.
//!
//! Wraps a [`SettingsStore`] so callers never touch raw keys or string
//! values. The rate limiter and orchestrator share one instance.

use crate::error::{HealerError, Result};
use crate::store::SettingsStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Settings seeded at first initialization.
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    (keys::DAILY_CONTACT_LIMIT, "25"),
    (keys::CURRENT_WEEK, "1"),
    (keys::PROGRESSIVE_LIMIT, "5"),
    (keys::MANUAL_APPROVAL_REQUIRED, "true"),
    (keys::WEEKEND_MODE, "true"),
    (keys::PLATFORM_ROTATION_DAY, "0"),
];

/// Setting keys.
pub mod keys {
    /// Configured outreach cap per day
    pub const DAILY_CONTACT_LIMIT: &str = "daily_contact_limit";
    /// Week of the progressive ramp, starting at 1
    pub const CURRENT_WEEK: &str = "current_week";
    /// Last computed progressive limit
    pub const PROGRESSIVE_LIMIT: &str = "progressive_limit";
    /// Human-in-the-loop switch for sends
    pub const MANUAL_APPROVAL_REQUIRED: &str = "manual_approval_required";
    /// Weekend blackout switch
    pub const WEEKEND_MODE: &str = "weekend_mode";
    /// Day of week discovery platforms rotate on
    pub const PLATFORM_ROTATION_DAY: &str = "platform_rotation_day";
    /// Emergency latch
    pub const EMERGENCY_STOP: &str = "emergency_stop";
    /// Why the latch was set
    pub const EMERGENCY_REASON: &str = "emergency_reason";
    /// When the latch was set (RFC 3339)
    pub const EMERGENCY_TIME: &str = "emergency_time";
}

/// A latched emergency stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyStop {
    /// Reason given when the stop was latched
    pub reason: String,
    /// When it was latched
    pub at: Option<DateTime<Utc>>,
}

/// Typed access to process-wide settings.
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings").finish_non_exhaustive()
    }
}

impl Settings {
    /// Create a settings service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Write any default setting that is missing. Existing values are kept.
    pub async fn seed_defaults(&self) -> Result<()> {
        for (key, value) in DEFAULT_SETTINGS {
            if self.store.get_setting(key).await?.is_none() {
                self.store.set_setting(key, value).await?;
            }
        }
        Ok(())
    }

    async fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.store.get_setting(key).await? {
            None => Ok(default),
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                HealerError::Validation(format!("setting {key} is not a boolean: '{raw}'"))
            }),
        }
    }

    async fn get_u32(&self, key: &str, default: u32) -> Result<u32> {
        match self.store.get_setting(key).await? {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| {
                HealerError::Validation(format!("setting {key} is not a number: '{raw}'"))
            }),
        }
    }

    /// Current week of the progressive ramp (at least 1).
    pub async fn current_week(&self) -> Result<u32> {
        Ok(self.get_u32(keys::CURRENT_WEEK, 1).await?.max(1))
    }

    /// Set the current ramp week.
    pub async fn set_current_week(&self, week: u32) -> Result<()> {
        if week == 0 {
            return Err(HealerError::Validation(
                "current week must be at least 1".to_string(),
            ));
        }
        self.store
            .set_setting(keys::CURRENT_WEEK, &week.to_string())
            .await
    }

    /// Store the progressive limit computed for the current week.
    pub async fn set_progressive_limit(&self, limit: u32) -> Result<()> {
        self.store
            .set_setting(keys::PROGRESSIVE_LIMIT, &limit.to_string())
            .await
    }

    /// Configured daily outreach cap.
    pub async fn daily_contact_limit(&self) -> Result<u32> {
        self.get_u32(keys::DAILY_CONTACT_LIMIT, 25).await
    }

    /// Whether the weekend blackout is enabled.
    pub async fn weekend_mode(&self) -> Result<bool> {
        self.get_bool(keys::WEEKEND_MODE, true).await
    }

    /// Enable or disable the weekend blackout.
    pub async fn set_weekend_mode(&self, enabled: bool) -> Result<()> {
        self.store
            .set_setting(keys::WEEKEND_MODE, bool_str(enabled))
            .await
    }

    /// Whether sends need a human to approve them.
    pub async fn manual_approval_required(&self) -> Result<bool> {
        self.get_bool(keys::MANUAL_APPROVAL_REQUIRED, true).await
    }

    /// Turn the manual approval gate on or off.
    pub async fn set_manual_approval(&self, required: bool) -> Result<()> {
        self.store
            .set_setting(keys::MANUAL_APPROVAL_REQUIRED, bool_str(required))
            .await
    }

    /// The latched emergency stop, if any.
    pub async fn emergency_state(&self) -> Result<Option<EmergencyStop>> {
        if !self.get_bool(keys::EMERGENCY_STOP, false).await? {
            return Ok(None);
        }

        let reason = self
            .store
            .get_setting(keys::EMERGENCY_REASON)
            .await?
            .unwrap_or_else(|| "unspecified".to_string());
        let at = self
            .store
            .get_setting(keys::EMERGENCY_TIME)
            .await?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Some(EmergencyStop { reason, at }))
    }

    /// Latch the emergency stop.
    pub async fn latch_emergency_stop(&self, reason: &str, at: DateTime<Utc>) -> Result<()> {
        self.store.set_setting(keys::EMERGENCY_STOP, "true").await?;
        self.store
            .set_setting(keys::EMERGENCY_REASON, reason)
            .await?;
        self.store
            .set_setting(keys::EMERGENCY_TIME, &at.to_rfc3339())
            .await?;
        tracing::error!(reason = %reason, "emergency stop latched");
        Ok(())
    }

    /// Clear a latched emergency stop.
    pub async fn clear_emergency_stop(&self) -> Result<()> {
        self.store.delete_setting(keys::EMERGENCY_STOP).await?;
        self.store.delete_setting(keys::EMERGENCY_REASON).await?;
        self.store.delete_setting(keys::EMERGENCY_TIME).await?;
        tracing::info!("emergency stop cleared");
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
