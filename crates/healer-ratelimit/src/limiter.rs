//! The rate limiter.
//!
//! Every outbound action asks [`RateLimiter::can_perform_action`] first and
//! reports back with [`RateLimiter::record_action`]. Checks run in order:
//! emergency stop, weekend blackout, known platform, rolling hourly window,
//! then the persisted daily counter against `min(progressive, hard)`.
//! A failing store denies the action.

use crate::clock::{Clock, SystemClock};
use crate::delay::{DelaySource, SeededDelays};
use crate::policy::{is_weekend_blackout, progressive_limit_for};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use healer_core::{CounterStore, EmergencyStop, RateLimitConfig, Result, Settings};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Answer to "may I do this now?". Denial is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    /// Whether the action may proceed
    pub allowed: bool,
    /// Why it may not
    pub reason: Option<String>,
    /// When the blocking window frees up, if known
    pub reset_time: Option<DateTime<Utc>>,
}

impl RateDecision {
    /// Permit the action.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            reset_time: None,
        }
    }

    /// Refuse the action.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            reset_time: None,
        }
    }

    #[must_use]
    fn until(mut self, reset: DateTime<Utc>) -> Self {
        self.reset_time = Some(reset);
        self
    }
}

/// One platform's usage today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformUsage {
    /// Platform tag
    pub platform: String,
    /// Actions recorded today, all action types
    pub used: u32,
    /// Effective daily limit
    pub limit: u32,
    /// Hourly ceiling, if any
    pub hourly_limit: Option<u32>,
}

/// Snapshot of the limiter state for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimiterStatus {
    /// Current ramp week
    pub week: u32,
    /// Ceiling for this week
    pub progressive_limit: u32,
    /// Whether the blackout setting is on
    pub weekend_mode_enabled: bool,
    /// Whether the blackout applies right now
    pub weekend_active: bool,
    /// Whether sends need approval
    pub manual_approval_required: bool,
    /// Latched emergency stop reason
    pub emergency_reason: Option<String>,
    /// Per-platform usage, sorted by platform
    pub platforms: Vec<PlatformUsage>,
}

type WindowKey = (String, String);

/// Governs every outbound action.
pub struct RateLimiter {
    counters: Arc<dyn CounterStore>,
    settings: Settings,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    delays: Arc<dyn DelaySource>,
    hourly: Mutex<HashMap<WindowKey, VecDeque<DateTime<Utc>>>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Limiter over the given counter store and settings, using the system
    /// clock and entropy-seeded delays.
    #[must_use]
    pub fn new(counters: Arc<dyn CounterStore>, settings: Settings, config: RateLimitConfig) -> Self {
        Self {
            counters,
            settings,
            config,
            clock: Arc::new(SystemClock),
            delays: Arc::new(SeededDelays::new(healer_core::DelayConfig::default())),
            hourly: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the delay source.
    #[must_use]
    pub fn with_delays(mut self, delays: Arc<dyn DelaySource>) -> Self {
        self.delays = delays;
        self
    }

    /// The settings service this limiter reads.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The delay source shared with callers that pace their own loops.
    #[must_use]
    pub fn delays(&self) -> Arc<dyn DelaySource> {
        Arc::clone(&self.delays)
    }

    /// Current instant according to the limiter's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Local calendar date the daily counters are keyed by.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.local_now().date()
    }

    /// Decide whether `(platform, action)` may happen now.
    pub async fn can_perform_action(&self, platform: &str, action: &str) -> RateDecision {
        match self.check(platform, action).await {
            Ok(decision) => {
                if !decision.allowed {
                    tracing::debug!(
                        platform = %platform,
                        action = %action,
                        reason = decision.reason.as_deref().unwrap_or_default(),
                        "action denied"
                    );
                }
                decision
            }
            Err(e) => {
                tracing::warn!(platform = %platform, action = %action, error = %e, "rate limit check failed");
                RateDecision::deny("Rate limit check failed")
            }
        }
    }

    async fn check(&self, platform: &str, action: &str) -> Result<RateDecision> {
        if let Some(stop) = self.settings.emergency_state().await? {
            return Ok(RateDecision::deny(format!(
                "Emergency stop active: {}",
                stop.reason
            )));
        }

        if self.is_weekend_mode_active().await? {
            return Ok(RateDecision::deny("Weekend mode is active"));
        }

        let Some(quota) = self.config.platforms.get(platform) else {
            return Ok(RateDecision::deny(format!("Unknown platform: {platform}")));
        };

        let now = self.clock.now();
        if let Some(hourly) = quota.hourly {
            let mut windows = self.hourly.lock().await;
            let window = windows
                .entry((platform.to_string(), action.to_string()))
                .or_default();
            prune(window, now);
            if window.len() >= hourly as usize {
                let reset = window
                    .front()
                    .map_or(now + Duration::hours(1), |oldest| *oldest + Duration::hours(1));
                return Ok(
                    RateDecision::deny(format!("Hourly {platform} limit reached ({hourly})"))
                        .until(reset),
                );
            }
        }

        let limit = self.progressive_limit().await?.min(quota.daily);
        let today = self.clock.local_now().date();
        let used = self.counters.action_count(platform, action, today).await?;
        if used >= limit {
            return Ok(RateDecision::deny(format!(
                "Daily {platform} limit reached ({limit})"
            )));
        }

        Ok(RateDecision::allow())
    }

    /// Count one performed action. Returns today's new total.
    pub async fn record_action(&self, platform: &str, action: &str) -> Result<u32> {
        let now = self.clock.now();
        let today = self.clock.local_now().date();

        {
            let mut windows = self.hourly.lock().await;
            let window = windows
                .entry((platform.to_string(), action.to_string()))
                .or_default();
            prune(window, now);
            window.push_back(now);
        }

        let count = self
            .counters
            .increment_action(platform, action, today, now)
            .await?;
        tracing::debug!(platform = %platform, action = %action, count, "action recorded");
        Ok(count)
    }

    /// Daily ceiling for the current ramp week.
    pub async fn progressive_limit(&self) -> Result<u32> {
        let week = self.settings.current_week().await?;
        Ok(progressive_limit_for(week, &self.config.progressive))
    }

    /// Set the ramp week and store the resulting limit.
    pub async fn update_week(&self, week: u32) -> Result<u32> {
        self.settings.set_current_week(week).await?;
        let limit = progressive_limit_for(week, &self.config.progressive);
        self.settings.set_progressive_limit(limit).await?;
        tracing::info!(week, limit, "progressive week updated");
        Ok(limit)
    }

    /// Whether the weekend blackout applies right now.
    pub async fn is_weekend_mode_active(&self) -> Result<bool> {
        if !self.settings.weekend_mode().await? {
            return Ok(false);
        }
        Ok(is_weekend_blackout(
            self.clock.local_now(),
            &self.config.weekend,
        ))
    }

    /// Whether sends need a human to approve them.
    pub async fn is_manual_approval_required(&self) -> Result<bool> {
        self.settings.manual_approval_required().await
    }

    /// Require approval before sends.
    pub async fn enable_manual_approval(&self) -> Result<()> {
        self.settings.set_manual_approval(true).await
    }

    /// Let sends proceed without approval.
    pub async fn disable_manual_approval(&self) -> Result<()> {
        self.settings.set_manual_approval(false).await
    }

    /// Latch the emergency stop. All further checks deny until cleared.
    pub async fn emergency_stop(&self, reason: &str) -> Result<()> {
        self.settings
            .latch_emergency_stop(reason, self.clock.now())
            .await
    }

    /// The latched emergency stop, if any.
    pub async fn is_emergency_stopped(&self) -> Result<Option<EmergencyStop>> {
        self.settings.emergency_state().await
    }

    /// Clear the emergency stop.
    pub async fn clear_emergency_stop(&self) -> Result<()> {
        self.settings.clear_emergency_stop().await
    }

    /// Snapshot for status output.
    pub async fn status(&self) -> Result<LimiterStatus> {
        let week = self.settings.current_week().await?;
        let progressive = progressive_limit_for(week, &self.config.progressive);
        let today = self.clock.local_now().date();

        let counts = self.counters.counts_for_date(today).await?;
        let platforms = self
            .config
            .platforms
            .iter()
            .map(|(platform, quota)| PlatformUsage {
                platform: platform.clone(),
                used: counts
                    .iter()
                    .filter(|c| &c.platform == platform)
                    .map(|c| c.count)
                    .sum(),
                limit: progressive.min(quota.daily),
                hourly_limit: quota.hourly,
            })
            .collect();

        Ok(LimiterStatus {
            week,
            progressive_limit: progressive,
            weekend_mode_enabled: self.settings.weekend_mode().await?,
            weekend_active: self.is_weekend_mode_active().await?,
            manual_approval_required: self.settings.manual_approval_required().await?,
            emergency_reason: self.settings.emergency_state().await?.map(|s| s.reason),
            platforms,
        })
    }
}

fn prune(window: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
    let cutoff = now - Duration::hours(1);
    while window.front().is_some_and(|t| *t <= cutoff) {
        window.pop_front();
    }
}
