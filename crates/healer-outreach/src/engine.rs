//! Rate-governed outreach: selection, per-send gates, batches and the daily
//! schedule.

use crate::error::{OutreachError, Result};
use crate::templates::{html_to_text, render, subject_variants, MergeFields, TemplateLibrary};
use crate::transport::{MailTransport, OutgoingEmail};
use crate::INITIAL_OUTREACH;
use healer_core::{
    DeliveryStatus, HealerCandidate, HealerFilter, HealerStatus, HealerStore, NewCampaign,
    OutreachConfig,
};
use healer_extract::is_valid_email;
use healer_ratelimit::{pause, RateLimiter};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

const EMAIL_PLATFORM: &str = "email";
const OUTREACH_ACTION: &str = "outreach";

/// Which healers are eligible for outreach.
#[derive(Debug, Clone, PartialEq)]
pub struct OutreachCriteria {
    /// Lifecycle status to select
    pub status: HealerStatus,
    /// Confidence floor, 0..1
    pub min_confidence: f64,
    /// Restrict to one source platform
    pub source_platform: Option<String>,
}

impl Default for OutreachCriteria {
    fn default() -> Self {
        Self {
            status: HealerStatus::Discovered,
            min_confidence: 0.6,
            source_platform: None,
        }
    }
}

impl OutreachCriteria {
    fn to_filter(&self) -> HealerFilter {
        let filter = HealerFilter::default()
            .with_status(self.status)
            .with_min_confidence(self.min_confidence);
        match &self.source_platform {
            Some(platform) => filter.with_platform(platform.clone()),
            None => filter,
        }
    }
}

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    /// Store id of the healer
    pub healer_id: Option<String>,
    /// Healer name, for reports
    pub healer_name: String,
    /// Whether the message went out
    pub success: bool,
    /// Why it did not
    pub reason: Option<String>,
    /// Provider message id
    pub message_id: Option<String>,
    /// Template rendered
    pub template_used: Option<String>,
    /// Subject sent
    pub subject: Option<String>,
    /// Bookkeeping that failed after the message went out
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SendOutcome {
    fn failed(healer: &HealerCandidate, reason: impl Into<String>) -> Self {
        Self {
            healer_id: healer.id.clone(),
            healer_name: healer.name.clone(),
            success: false,
            reason: Some(reason.into()),
            message_id: None,
            template_used: None,
            subject: None,
            warnings: Vec::new(),
        }
    }
}

/// Totals for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Healers handled, sent or not
    pub total: usize,
    /// Messages sent
    pub successful: usize,
    /// Messages not sent
    pub failed: usize,
    /// `successful / total` as a rounded percentage
    pub success_rate: u32,
}

impl BatchSummary {
    fn from_results(results: &[SendOutcome]) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let success_rate = if total == 0 {
            0
        } else {
            ((successful as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            total,
            successful,
            failed: total - successful,
            success_rate,
        }
    }
}

/// Per-healer results plus totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One entry per input healer, in input order
    pub results: Vec<SendOutcome>,
    /// Totals
    pub summary: BatchSummary,
}

/// What the daily schedule did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DailyOutreach {
    /// Nothing was attempted
    Skipped {
        /// Why
        reason: String,
    },
    /// A batch pass ran
    Ran {
        /// Batch results
        batch: BatchReport,
        /// Smallest of the progressive, configured and stored daily limits
        daily_target: u32,
        /// Eligible healers before the target was applied
        available: usize,
    },
}

/// Sends outreach mail under the rate limiter.
pub struct OutreachEngine {
    store: Arc<dyn HealerStore>,
    limiter: Arc<RateLimiter>,
    transport: Arc<dyn MailTransport>,
    templates: TemplateLibrary,
    config: OutreachConfig,
}

impl std::fmt::Debug for OutreachEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutreachEngine")
            .field("batch_size", &self.config.batch_size)
            .field("daily_limit", &self.config.daily_limit)
            .finish_non_exhaustive()
    }
}

impl OutreachEngine {
    /// Create an engine with the built-in templates.
    #[must_use]
    pub fn new(
        store: Arc<dyn HealerStore>,
        limiter: Arc<RateLimiter>,
        transport: Arc<dyn MailTransport>,
        config: OutreachConfig,
    ) -> Self {
        Self {
            store,
            limiter,
            transport,
            templates: TemplateLibrary::builtin(),
            config,
        }
    }

    /// Replace the template library.
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = templates;
        self
    }

    /// The template library in use.
    #[must_use]
    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Healers that can be emailed, best first: confidence, then having a
    /// website, then most recently discovered.
    pub async fn get_healers_for_outreach(
        &self,
        criteria: &OutreachCriteria,
    ) -> Result<Vec<HealerCandidate>> {
        let mut healers = self.store.get_healers(&criteria.to_filter()).await?;
        healers.retain(|h| h.email.as_deref().is_some_and(is_valid_email));
        healers.sort_by(|a, b| {
            b.contact_confidence
                .value()
                .total_cmp(&a.contact_confidence.value())
                .then_with(|| b.has_website().cmp(&a.has_website()))
                .then_with(|| b.discovered_at.cmp(&a.discovered_at))
        });
        Ok(healers)
    }

    /// Default eligibility, using the configured confidence floor.
    #[must_use]
    pub fn default_criteria(&self) -> OutreachCriteria {
        OutreachCriteria {
            min_confidence: self.config.min_confidence,
            ..OutreachCriteria::default()
        }
    }

    /// Render `template` for `healer` without sending.
    pub fn render_email(
        &self,
        healer: &HealerCandidate,
        template: &str,
        custom_subject: Option<&str>,
    ) -> Result<OutgoingEmail> {
        let source = self
            .templates
            .get(template)
            .ok_or_else(|| OutreachError::Template(format!("template not found: {template}")))?;
        let fields = MergeFields::for_healer(healer, &self.config.platform, self.limiter.now());

        let subject = match custom_subject {
            Some(subject) => subject.to_string(),
            None => {
                let variants = subject_variants(template, &fields);
                let pick = self.limiter.delays().pick(variants.len());
                variants.into_iter().nth(pick).unwrap_or_default()
            }
        };
        let html = render(template, source, &fields)?;
        let text = html_to_text(&html);

        Ok(OutgoingEmail {
            to: healer.email.clone().unwrap_or_default(),
            subject,
            html,
            text,
            campaign_type: template.to_string(),
        })
    }

    /// Send one outreach email.
    ///
    /// Gates, in order: rate limit, manual approval, email present, template
    /// known. A gate that stops the send consumes no quota and writes no
    /// campaign. Failures are reported in the outcome, never raised.
    pub async fn send_outreach_email(
        &self,
        healer: &HealerCandidate,
        template: &str,
        custom_subject: Option<&str>,
    ) -> SendOutcome {
        let decision = self
            .limiter
            .can_perform_action(EMAIL_PLATFORM, OUTREACH_ACTION)
            .await;
        if !decision.allowed {
            info!(
                healer = %healer.name,
                reason = decision.reason.as_deref().unwrap_or_default(),
                reset = ?decision.reset_time,
                "outreach rate limited"
            );
            return SendOutcome::failed(healer, "Rate limit exceeded");
        }

        match self.limiter.is_manual_approval_required().await {
            Ok(false) => {}
            Ok(true) => {
                info!(healer = %healer.name, "outreach waiting for manual approval");
                return SendOutcome::failed(healer, "Manual approval required");
            }
            Err(e) => {
                warn!(error = %e, "could not read manual approval setting");
                return SendOutcome::failed(healer, "Manual approval required");
            }
        }

        if !healer.has_email() {
            return SendOutcome::failed(healer, "No email address available");
        }

        if self.templates.get(template).is_none() {
            warn!(template = %template, "email template not found");
            return SendOutcome::failed(healer, "Template not found");
        }

        match self.deliver(healer, template, custom_subject).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(healer = %healer.name, template = %template, error = %e, "outreach failed");
                SendOutcome::failed(healer, e.to_string())
            }
        }
    }

    async fn deliver(
        &self,
        healer: &HealerCandidate,
        template: &str,
        custom_subject: Option<&str>,
    ) -> Result<SendOutcome> {
        let healer_id = healer.id.clone().ok_or_else(|| {
            OutreachError::Template(format!("healer '{}' has not been saved", healer.name))
        })?;
        let email = self.render_email(healer, template, custom_subject)?;

        let receipt = self.transport.send(&email).await?;

        // The message is out; from here on failures are logged, never raised.
        let mut warnings = Vec::new();

        if let Err(e) = self
            .store
            .update_healer_status(
                &healer_id,
                HealerStatus::Contacted,
                Some(&format!("Sent {template} email")),
            )
            .await
        {
            error!(healer = %healer.name, error = %e, "sent outreach but could not mark healer contacted");
            warnings.push(format!("status not updated: {e}"));
        }

        if let Err(e) = self
            .limiter
            .record_action(EMAIL_PLATFORM, OUTREACH_ACTION)
            .await
        {
            error!(error = %e, "sent outreach but could not record it against the quota");
            warnings.push(format!("quota not recorded: {e}"));
        }

        if let Err(e) = self
            .store
            .log_campaign(NewCampaign {
                healer_id: healer_id.clone(),
                campaign_type: template.to_string(),
                subject: email.subject.clone(),
                template_used: template.to_string(),
                message_id: receipt.message_id.clone(),
                delivery_status: DeliveryStatus::Sent,
            })
            .await
        {
            error!(healer = %healer.name, error = %e, "sent outreach but could not log the campaign");
            warnings.push(format!("campaign not logged: {e}"));
        }

        info!(
            healer = %healer.name,
            template = %template,
            subject = %email.subject,
            "outreach sent"
        );

        Ok(SendOutcome {
            healer_id: Some(healer_id),
            healer_name: healer.name.clone(),
            success: true,
            reason: None,
            message_id: receipt.message_id,
            template_used: Some(template.to_string()),
            subject: Some(email.subject),
            warnings,
        })
    }

    /// Send `template` to each healer in batches.
    ///
    /// The limiter is checked before every send; the first denial marks the
    /// rest `Daily limit reached` and ends the run.
    pub async fn batch_outreach(&self, healers: &[HealerCandidate], template: &str) -> BatchReport {
        let batch_size = self.config.batch_size.max(1);
        let batch_count = healers.len().div_ceil(batch_size);
        let delays = self.limiter.delays();
        let mut results = Vec::with_capacity(healers.len());

        info!(
            total = healers.len(),
            batch_size,
            template = %template,
            "starting batch outreach"
        );

        'batches: for (index, batch) in healers.chunks(batch_size).enumerate() {
            info!(batch = index + 1, of = batch_count, "processing outreach batch");

            for (position, healer) in batch.iter().enumerate() {
                let decision = self
                    .limiter
                    .can_perform_action(EMAIL_PLATFORM, OUTREACH_ACTION)
                    .await;
                if !decision.allowed {
                    info!(
                        reason = decision.reason.as_deref().unwrap_or_default(),
                        remaining = healers.len() - results.len(),
                        "batch outreach stopped by rate limiter"
                    );
                    let done = results.len();
                    results.extend(
                        healers[done..]
                            .iter()
                            .map(|h| SendOutcome::failed(h, "Daily limit reached")),
                    );
                    break 'batches;
                }

                results.push(self.send_outreach_email(healer, template, None).await);

                if position + 1 < batch.len() {
                    pause(delays.random_delay()).await;
                }
            }

            if index + 1 < batch_count {
                pause(delays.email_batch_delay()).await;
            }
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            sent = summary.successful,
            failed = summary.failed,
            success_rate = summary.success_rate,
            "batch outreach complete"
        );
        BatchReport { results, summary }
    }

    /// One day's outreach: the best eligible healers up to the smallest of
    /// the progressive limit, the configured daily limit and the stored
    /// `daily_contact_limit` setting, with the initial template.
    pub async fn schedule_daily_outreach(&self) -> Result<DailyOutreach> {
        info!("starting scheduled daily outreach");

        if self.limiter.is_weekend_mode_active().await? {
            info!("weekend mode active, skipping outreach");
            return Ok(DailyOutreach::Skipped {
                reason: "Weekend mode active".to_string(),
            });
        }

        let healers = self.get_healers_for_outreach(&self.default_criteria()).await?;
        if healers.is_empty() {
            info!("no healers available for outreach");
            return Ok(DailyOutreach::Skipped {
                reason: "No healers available".to_string(),
            });
        }

        let progressive = self.limiter.progressive_limit().await?;
        let contact_limit = self.limiter.settings().daily_contact_limit().await?;
        let daily_target = progressive
            .min(self.config.daily_limit)
            .min(contact_limit);
        let target = usize::try_from(daily_target).unwrap_or(usize::MAX);
        let available = healers.len();
        let selected = &healers[..available.min(target)];

        info!(
            available,
            target = selected.len(),
            progressive,
            contact_limit,
            "daily outreach target"
        );
        let batch = self.batch_outreach(selected, INITIAL_OUTREACH).await;

        Ok(DailyOutreach::Ran {
            batch,
            daily_target,
            available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;
    use chrono::{Duration, NaiveDate, Utc};
    use healer_core::{
        CampaignRecord, Confidence, DelayConfig, HealerError, HealerStats, MemoryStore,
        PlatformQuota, RateLimitConfig, Settings, SettingsStore,
    };
    use healer_ratelimit::{FixedClock, SeededDelays};

    struct Harness {
        store: Arc<MemoryStore>,
        limiter: Arc<RateLimiter>,
        transport: Arc<RecordingTransport>,
        engine: OutreachEngine,
    }

    async fn harness(email_daily: u32, day: u32, transport: RecordingTransport) -> Harness {
        let store = Arc::new(MemoryStore::with_default_settings());
        let settings = Settings::new(store.clone());
        settings
            .set_manual_approval(false)
            .await
            .expect("disable approval");

        let mut rate_limits = RateLimitConfig::default();
        rate_limits.platforms.insert(
            "email".to_string(),
            PlatformQuota {
                daily: email_daily,
                hourly: None,
            },
        );
        let at = NaiveDate::from_ymd_opt(2026, 3, day)
            .and_then(|d| d.and_hms_opt(11, 0, 0))
            .expect("valid datetime");
        let limiter = Arc::new(
            RateLimiter::new(store.clone(), settings, rate_limits)
                .with_clock(Arc::new(FixedClock::new(at)))
                .with_delays(Arc::new(SeededDelays::new(DelayConfig {
                    seed: Some(7),
                    ..DelayConfig::none()
                }))),
        );
        let transport = Arc::new(transport);
        let engine = OutreachEngine::new(
            store.clone(),
            limiter.clone(),
            transport.clone(),
            OutreachConfig::default(),
        );
        Harness {
            store,
            limiter,
            transport,
            engine,
        }
    }

    async fn seed(store: &MemoryStore, n: usize) -> Vec<HealerCandidate> {
        let mut saved = Vec::new();
        for i in 0..n {
            let mut h = HealerCandidate::new(format!("Healer {i}"), "psychology_today");
            h.email = Some(format!("healer{i}@healing{i}.com"));
            h.contact_confidence = Confidence::new(0.7);
            h.id = Some(store.upsert_healer(&h).await.expect("upsert"));
            saved.push(h);
        }
        saved
    }

    #[tokio::test]
    async fn test_batch_stops_at_ceiling() {
        let h = harness(3, 3, RecordingTransport::new()).await;
        let healers = seed(&h.store, 10).await;

        let report = h.engine.batch_outreach(&healers, INITIAL_OUTREACH).await;

        assert_eq!(report.summary.total, 10);
        assert_eq!(report.summary.successful, 3);
        assert_eq!(report.summary.failed, 7);
        assert_eq!(report.summary.success_rate, 30);
        assert!(report.results[3..]
            .iter()
            .all(|r| r.reason.as_deref() == Some("Daily limit reached")));
        assert_eq!(h.store.campaign_count().await, 3);
        assert_eq!(h.transport.sent().len(), 3);

        let contacted = h
            .store
            .get_healers(&HealerFilter::default().with_status(HealerStatus::Contacted))
            .await
            .expect("read back");
        assert_eq!(contacted.len(), 3);
        assert!(contacted
            .iter()
            .all(|c| c.notes.as_deref() == Some("Sent initial_outreach email")));
    }

    #[tokio::test]
    async fn test_gates_in_order() {
        let h = harness(25, 3, RecordingTransport::new()).await;
        let healers = seed(&h.store, 1).await;
        let healer = &healers[0];

        h.limiter
            .enable_manual_approval()
            .await
            .expect("enable approval");
        let outcome = h
            .engine
            .send_outreach_email(healer, INITIAL_OUTREACH, None)
            .await;
        assert_eq!(outcome.reason.as_deref(), Some("Manual approval required"));
        h.limiter
            .disable_manual_approval()
            .await
            .expect("disable approval");

        let mut no_email = healer.clone();
        no_email.email = None;
        let outcome = h
            .engine
            .send_outreach_email(&no_email, INITIAL_OUTREACH, None)
            .await;
        assert_eq!(outcome.reason.as_deref(), Some("No email address available"));

        let outcome = h.engine.send_outreach_email(healer, "newsletter", None).await;
        assert_eq!(outcome.reason.as_deref(), Some("Template not found"));

        h.limiter.emergency_stop("test").await.expect("stop");
        let outcome = h
            .engine
            .send_outreach_email(healer, INITIAL_OUTREACH, None)
            .await;
        assert_eq!(outcome.reason.as_deref(), Some("Rate limit exceeded"));

        // None of the gated attempts consumed quota or wrote a campaign
        assert_eq!(h.store.campaign_count().await, 0);
        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_successful_send_uses_custom_subject() {
        let h = harness(25, 3, RecordingTransport::new()).await;
        let healers = seed(&h.store, 1).await;

        let outcome = h
            .engine
            .send_outreach_email(&healers[0], "reiki_master", Some("A note for you"))
            .await;
        assert!(outcome.success, "{outcome:?}");
        assert_eq!(outcome.subject.as_deref(), Some("A note for you"));

        let sent = h.transport.sent();
        assert_eq!(sent[0].to, "healer0@healing0.com");
        assert_eq!(sent[0].campaign_type, "reiki_master");
        assert!(sent[0].text.contains("Reiki Master"));
        assert!(!sent[0].text.contains('<'));

        let campaigns = h
            .store
            .campaigns_for(healers[0].id.as_deref().expect("id"))
            .await
            .expect("campaigns");
        assert_eq!(campaigns.len(), 1);
        assert_eq!(campaigns[0].delivery_status, DeliveryStatus::Sent);
        assert_eq!(campaigns[0].message_id.as_deref(), Some("<recorded-1@localhost>"));
    }

    /// Delegates to a `MemoryStore` but cannot write campaigns.
    struct CampaignLogDown(Arc<MemoryStore>);

    #[async_trait::async_trait]
    impl HealerStore for CampaignLogDown {
        async fn upsert_healer(&self, healer: &HealerCandidate) -> healer_core::Result<String> {
            self.0.upsert_healer(healer).await
        }

        async fn get_healers(
            &self,
            filter: &HealerFilter,
        ) -> healer_core::Result<Vec<HealerCandidate>> {
            self.0.get_healers(filter).await
        }

        async fn update_healer_status(
            &self,
            id: &str,
            status: HealerStatus,
            note: Option<&str>,
        ) -> healer_core::Result<()> {
            self.0.update_healer_status(id, status, note).await
        }

        async fn log_campaign(&self, _campaign: NewCampaign) -> healer_core::Result<CampaignRecord> {
            Err(HealerError::Store("disk full".to_string()))
        }

        async fn campaigns_for(&self, healer_id: &str) -> healer_core::Result<Vec<CampaignRecord>> {
            self.0.campaigns_for(healer_id).await
        }

        async fn stats(&self, today: NaiveDate) -> healer_core::Result<HealerStats> {
            self.0.stats(today).await
        }
    }

    #[tokio::test]
    async fn test_sent_mail_stays_sent_when_campaign_log_fails() {
        let h = harness(25, 3, RecordingTransport::new()).await;
        let healers = seed(&h.store, 1).await;
        let engine = OutreachEngine::new(
            Arc::new(CampaignLogDown(h.store.clone())),
            h.limiter.clone(),
            h.transport.clone(),
            OutreachConfig::default(),
        );

        let outcome = engine
            .send_outreach_email(&healers[0], INITIAL_OUTREACH, None)
            .await;
        assert!(outcome.success, "{outcome:?}");
        assert_eq!(outcome.message_id.as_deref(), Some("<recorded-1@localhost>"));
        assert!(outcome.reason.is_none());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("disk full"));
        assert_eq!(h.transport.sent().len(), 1);

        // The healer is not offered for a second email
        let eligible = engine
            .get_healers_for_outreach(&engine.default_criteria())
            .await
            .expect("select");
        assert!(eligible.is_empty());

        let status = h.limiter.status().await.expect("status");
        let email = status
            .platforms
            .iter()
            .find(|p| p.platform == "email")
            .expect("email quota");
        assert_eq!(email.used, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let h = harness(25, 3, RecordingTransport::new().rejecting("healer0@healing0.com")).await;
        let healers = seed(&h.store, 1).await;

        let outcome = h
            .engine
            .send_outreach_email(&healers[0], INITIAL_OUTREACH, None)
            .await;
        assert!(!outcome.success);
        assert!(outcome
            .reason
            .as_deref()
            .is_some_and(|r| r.contains("mailbox unavailable")));
        assert_eq!(h.store.campaign_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_placeholder_fails_the_send() {
        let h = harness(25, 3, RecordingTransport::new()).await;
        let healers = seed(&h.store, 1).await;
        let dir = tempfile::TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("custom.html"), "<p>Hi {{nickname}}</p>")
            .expect("write template");
        let engine = OutreachEngine::new(
            h.store.clone(),
            h.limiter.clone(),
            h.transport.clone(),
            OutreachConfig::default(),
        )
        .with_templates(TemplateLibrary::with_overrides(dir.path()).expect("templates"));

        let outcome = engine.send_outreach_email(&healers[0], "custom", None).await;
        assert!(!outcome.success);
        assert!(outcome
            .reason
            .as_deref()
            .is_some_and(|r| r.contains("nickname")));
        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_selection_order_and_filtering() {
        let h = harness(25, 3, RecordingTransport::new()).await;
        let now = Utc::now();

        let mut records = Vec::new();
        let mut low = HealerCandidate::new("Low", "psychology_today");
        low.email = Some("low@healing.com".to_string());
        low.contact_confidence = Confidence::new(0.5);
        records.push(low);

        let mut plain = HealerCandidate::new("Plain", "psychology_today");
        plain.email = Some("plain@healing.com".to_string());
        plain.contact_confidence = Confidence::new(0.8);
        plain.discovered_at = now - Duration::days(2);
        records.push(plain);

        let mut with_site = HealerCandidate::new("Site", "psychology_today");
        with_site.email = Some("site@healing.com".to_string());
        with_site.website = Some("https://healing.com".to_string());
        with_site.contact_confidence = Confidence::new(0.8);
        with_site.discovered_at = now - Duration::days(5);
        records.push(with_site);

        let mut best = HealerCandidate::new("Best", "instagram");
        best.email = Some("best@healing.com".to_string());
        best.contact_confidence = Confidence::new(0.9);
        records.push(best);

        let mut insta_only = HealerCandidate::new("Insta", "instagram");
        insta_only.instagram = Some("https://instagram.com/insta".to_string());
        insta_only.contact_confidence = Confidence::new(0.9);
        records.push(insta_only);

        let mut broken = HealerCandidate::new("Broken", "psychology_today");
        broken.email = Some("not-an-email".to_string());
        broken.contact_confidence = Confidence::new(0.9);
        records.push(broken);

        for r in &records {
            h.store.upsert_healer(r).await.expect("upsert");
        }

        let selected = h
            .engine
            .get_healers_for_outreach(&OutreachCriteria::default())
            .await
            .expect("select");
        let names: Vec<_> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Best", "Site", "Plain"]);
    }

    #[tokio::test]
    async fn test_daily_schedule_skips_weekend() {
        // 2026-03-07 is a Saturday
        let h = harness(25, 7, RecordingTransport::new()).await;
        seed(&h.store, 2).await;
        let outcome = h.engine.schedule_daily_outreach().await.expect("schedule");
        assert_eq!(
            outcome,
            DailyOutreach::Skipped {
                reason: "Weekend mode active".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_daily_schedule_targets_progressive_limit() {
        let h = harness(25, 3, RecordingTransport::new()).await;

        let empty = h.engine.schedule_daily_outreach().await.expect("schedule");
        assert_eq!(
            empty,
            DailyOutreach::Skipped {
                reason: "No healers available".to_string()
            }
        );

        seed(&h.store, 8).await;
        let DailyOutreach::Ran {
            batch,
            daily_target,
            available,
        } = h.engine.schedule_daily_outreach().await.expect("schedule")
        else {
            panic!("expected a batch run");
        };
        assert_eq!(daily_target, 5);
        assert_eq!(available, 8);
        assert_eq!(batch.summary.total, 5);
        assert_eq!(batch.summary.successful, 5);
    }

    #[tokio::test]
    async fn test_daily_schedule_honours_stored_contact_limit() {
        let h = harness(25, 3, RecordingTransport::new()).await;
        seed(&h.store, 8).await;
        h.store
            .set_setting("daily_contact_limit", "2")
            .await
            .expect("lower contact limit");

        let DailyOutreach::Ran {
            batch,
            daily_target,
            available,
        } = h.engine.schedule_daily_outreach().await.expect("schedule")
        else {
            panic!("expected a batch run");
        };
        assert_eq!(daily_target, 2);
        assert_eq!(available, 8);
        assert_eq!(batch.summary.total, 2);
        assert_eq!(h.transport.sent().len(), 2);
    }
}
