//! The pipeline orchestrator.
//!
//! A run checks its preconditions once, then moves through
//! Discovery → Enrichment → Outreach → Export. Each phase's failure is caught
//! into the [`RunReport`] so later phases still run, except emergency-class
//! failures, which latch the emergency stop and end the run.

use crate::error::{is_emergency_message, PipelineError, Result};
use crate::report::{
    EnrichmentReport, OutreachReport, RunOutcome, RunReport, SourceReport,
};
use crate::sources::build_sources;
use healer_core::{
    AppConfig, HealerCandidate, HealerError, HealerFilter, HealerStats, HealerStore, PageFetcher,
    Settings,
};
use healer_db::Database;
use healer_discovery::DiscoverySource;
use healer_export::{ExportFormat, ExportResult, Exporter};
use healer_extract::{ContactExtractor, HttpFetcher};
use healer_outreach::{
    DailyOutreach, MailTransport, OutreachEngine, RecordingTransport, SmtpTransport,
    TemplateLibrary,
};
use healer_ratelimit::{pause, LimiterStatus, RateLimiter, SeededDelays};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Snapshot for the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    /// Store totals
    pub stats: HealerStats,
    /// Ramp, weekend, approval, emergency and per-platform usage
    pub limiter: LimiterStatus,
    /// Whether sends are suppressed
    pub dry_run: bool,
    /// Whether the outreach phase is enabled
    pub outreach_enabled: bool,
    /// Discovery sources, in run order
    pub sources: Vec<String>,
}

/// Sequences the phases of a run over shared components.
pub struct Pipeline {
    config: AppConfig,
    store: Arc<dyn HealerStore>,
    limiter: Arc<RateLimiter>,
    sources: Vec<Box<dyn DiscoverySource>>,
    extractor: ContactExtractor,
    outreach: OutreachEngine,
    exporter: Exporter,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("dry_run", &self.config.general.dry_run)
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assemble a pipeline from ready components. Sources are added with
    /// [`Pipeline::with_sources`].
    ///
    /// # Errors
    /// Returns error if the config does not validate (including missing SMTP
    /// credentials when sends are enabled), or templates or the export
    /// format cannot be loaded.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn HealerStore>,
        limiter: Arc<RateLimiter>,
        fetcher: Arc<dyn PageFetcher>,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let templates = match &config.general.templates_dir {
            Some(dir) => TemplateLibrary::with_overrides(dir)?,
            None => TemplateLibrary::builtin(),
        };
        let extractor = ContactExtractor::new(fetcher, limiter.clone());
        let outreach = OutreachEngine::new(
            store.clone(),
            limiter.clone(),
            transport,
            config.outreach.clone(),
        )
        .with_templates(templates);
        let exporter = Exporter::new(store.clone(), &config.export)?;

        Ok(Self {
            config,
            store,
            limiter,
            sources: Vec::new(),
            extractor,
            outreach,
            exporter,
        })
    }

    /// Wire a pipeline over the SQLite store from `config`.
    ///
    /// Fails before any external action when the config is invalid, in
    /// particular when sends are enabled without SMTP credentials.
    pub async fn from_config(config: AppConfig, db: Arc<Database>) -> Result<Self> {
        config.validate()?;

        let settings = Settings::new(db.clone());
        settings.seed_defaults().await?;
        let limiter = Arc::new(
            RateLimiter::new(db.clone(), settings, config.rate_limits.clone())
                .with_delays(Arc::new(SeededDelays::new(config.delays.clone()))),
        );

        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.discovery)?);
        let transport: Arc<dyn MailTransport> = if config.sends_email() {
            Arc::new(SmtpTransport::new(&config.outreach)?)
        } else {
            Arc::new(RecordingTransport::new())
        };
        let sources = build_sources(&config, &fetcher, &limiter)?;

        info!(
            dry_run = config.general.dry_run,
            outreach = config.pipeline.enable_outreach,
            sources = sources.len(),
            "pipeline initialized"
        );
        Ok(Self::new(config, db, limiter, fetcher, transport)?.with_sources(sources))
    }

    /// Replace the discovery sources.
    #[must_use]
    pub fn with_sources(mut self, sources: Vec<Box<dyn DiscoverySource>>) -> Self {
        self.sources = sources;
        self
    }

    /// The rate limiter shared by every phase.
    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run every enabled phase.
    ///
    /// A latched emergency stop refuses the run and the weekend blackout
    /// skips it; in both cases no source is touched.
    pub async fn run_full(&mut self) -> Result<RunReport> {
        info!("starting full pipeline");
        let week = self.limiter.settings().current_week().await?;

        if let Some(stop) = self.limiter.is_emergency_stopped().await? {
            error!(reason = %stop.reason, "emergency stop is active, refusing run");
            return Ok(RunReport::new(
                week,
                RunOutcome::Refused {
                    reason: stop.reason,
                },
            ));
        }
        if self.limiter.is_weekend_mode_active().await? {
            info!("weekend mode active, skipping run");
            return Ok(RunReport::new(
                week,
                RunOutcome::Skipped {
                    reason: "Weekend mode active".to_string(),
                },
            ));
        }

        info!(week, "running pipeline");
        let mut report = RunReport::new(week, RunOutcome::Completed);

        info!("phase 1: discovery");
        let discovered = self.discover_all(&mut report).await?;

        info!("phase 2: enrichment");
        self.enrich_and_save(discovered, &mut report).await;

        info!("phase 3: outreach");
        report.outreach = self.outreach_phase(&mut report).await?;

        if self.config.pipeline.enable_export {
            info!("phase 4: export");
            match self.exporter.export_for_email_campaign().await {
                Ok(export) => report.export = Some(export),
                Err(e) => {
                    error!(error = %e, "export failed");
                    report.phase_error("export", e.to_string());
                }
            }
        }

        self.log_daily_report(&report).await;
        info!(
            discovered = report.discovery.total,
            saved = report.enrichment.saved,
            sent = report.outreach.sent(),
            errors = report.errors.len(),
            "full pipeline complete"
        );
        Ok(report)
    }

    /// Discovery and enrichment only. Candidates are saved; nothing is sent.
    pub async fn run_discovery_only(&mut self) -> Result<Vec<HealerCandidate>> {
        self.ensure_not_stopped().await?;
        info!("running discovery only");

        let week = self.limiter.settings().current_week().await?;
        let mut report = RunReport::new(week, RunOutcome::Completed);
        let discovered = self.discover_all(&mut report).await?;
        let enriched = self.enrich_and_save(discovered, &mut report).await;

        info!(
            total = enriched.len(),
            with_contacts = report.enrichment.with_contacts,
            "discovery complete"
        );
        Ok(enriched)
    }

    /// The daily outreach schedule only.
    pub async fn run_outreach_only(&self) -> Result<DailyOutreach> {
        if !self.config.pipeline.enable_outreach {
            return Err(PipelineError::OutreachDisabled);
        }
        self.ensure_not_stopped().await?;
        if self.config.general.dry_run {
            info!("dry run, not sending");
            return Ok(DailyOutreach::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        info!("running outreach only");
        match self.outreach.schedule_daily_outreach().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => match self.escalate(e.to_string()).await {
                Some(emergency) => Err(emergency),
                None => Err(e.into()),
            },
        }
    }

    /// Export healers matching `filter`.
    pub async fn export(
        &self,
        filter: &HealerFilter,
        format: Option<ExportFormat>,
    ) -> Result<ExportResult> {
        Ok(self.exporter.export_healers(filter, format).await?)
    }

    /// Store totals and limiter state.
    pub async fn status(&self) -> Result<PipelineStatus> {
        let stats = self.store.stats(self.limiter.today()).await?;
        let limiter = self.limiter.status().await?;
        Ok(PipelineStatus {
            stats,
            limiter,
            dry_run: self.config.general.dry_run,
            outreach_enabled: self.config.pipeline.enable_outreach,
            sources: self.sources.iter().map(|s| s.name().to_string()).collect(),
        })
    }

    /// Move the ramp to `week`. Returns the new progressive limit.
    pub async fn advance_week(&self, week: u32) -> Result<u32> {
        if week == 0 {
            return Err(HealerError::Validation("week numbers start at 1".to_string()).into());
        }
        Ok(self.limiter.update_week(week).await?)
    }

    /// Require, or stop requiring, manual approval before each send.
    pub async fn set_manual_approval(&self, required: bool) -> Result<()> {
        if required {
            self.limiter.enable_manual_approval().await?;
        } else {
            self.limiter.disable_manual_approval().await?;
        }
        Ok(())
    }

    /// Clear a latched emergency stop.
    pub async fn resume(&self) -> Result<()> {
        match self.limiter.is_emergency_stopped().await? {
            Some(stop) => info!(reason = %stop.reason, "clearing emergency stop"),
            None => info!("no emergency stop was active"),
        }
        self.limiter.clear_emergency_stop().await?;
        Ok(())
    }

    /// Close every source. Safe to call more than once.
    pub async fn cleanup(&mut self) {
        info!("cleaning up pipeline resources");
        for source in &mut self.sources {
            if let Err(e) = source.close().await {
                warn!(source = %source.name(), error = %e, "failed to close source");
            }
        }
    }

    async fn ensure_not_stopped(&self) -> Result<()> {
        match self.limiter.is_emergency_stopped().await? {
            Some(stop) => Err(PipelineError::EmergencyStopActive {
                reason: stop.reason,
            }),
            None => Ok(()),
        }
    }

    /// Latch the emergency stop if `message` is emergency-class.
    async fn escalate(&self, message: String) -> Option<PipelineError> {
        if !is_emergency_message(&message) {
            return None;
        }
        self.latch(&message).await;
        Some(PipelineError::Emergency { reason: message })
    }

    async fn latch(&self, reason: &str) {
        error!(reason = %reason, "activating emergency stop");
        if let Err(e) = self.limiter.emergency_stop(reason).await {
            error!(error = %e, "failed to persist emergency stop");
        }
    }

    async fn discover_all(&mut self, report: &mut RunReport) -> Result<Vec<HealerCandidate>> {
        let delays = self.limiter.delays();
        let mut discovered = Vec::new();

        for index in 0..self.sources.len() {
            if index > 0 {
                pause(delays.between_platform_delay()).await;
            }

            let source = &mut self.sources[index];
            let name = source.name().to_string();
            info!(source = %name, "discovering");
            let result = source.discover().await;
            if let Err(e) = source.close().await {
                warn!(source = %name, error = %e, "failed to close source");
            }

            match result {
                Ok(found) => {
                    info!(source = %name, found = found.len(), "source finished");
                    report.discovery.sources.push(SourceReport {
                        source: name,
                        found: found.len(),
                        error: None,
                    });
                    discovered.extend(found);
                }
                Err(e) if e.is_blocked() || is_emergency_message(&e.to_string()) => {
                    let reason = e.to_string();
                    self.latch(&reason).await;
                    return Err(PipelineError::Emergency { reason });
                }
                Err(e) => {
                    error!(source = %name, error = %e, "discovery source failed");
                    report.phase_error("discovery", format!("{name}: {e}"));
                    report.discovery.sources.push(SourceReport {
                        source: name,
                        found: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        report.discovery.total = discovered.len();
        Ok(discovered)
    }

    async fn enrich_and_save(
        &self,
        discovered: Vec<HealerCandidate>,
        report: &mut RunReport,
    ) -> Vec<HealerCandidate> {
        if discovered.is_empty() {
            return discovered;
        }

        let enriched = self.extractor.batch_enrich(discovered).await;
        let mut summary = EnrichmentReport {
            processed: enriched.len(),
            with_contacts: enriched
                .iter()
                .filter(|h| h.has_email() || h.has_phone())
                .count(),
            ..EnrichmentReport::default()
        };

        for healer in &enriched {
            match self.store.upsert_healer(healer).await {
                Ok(id) => {
                    debug!(healer = %healer.name, id = %id, "saved healer");
                    summary.saved += 1;
                }
                Err(HealerError::Duplicate(key)) => {
                    debug!(healer = %healer.name, key = %key, "duplicate healer skipped");
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!(healer = %healer.name, error = %e, "failed to save healer");
                    summary.failed += 1;
                }
            }
        }

        if summary.failed > 0 {
            report.phase_error(
                "enrichment",
                format!("{} of {} healers could not be saved", summary.failed, enriched.len()),
            );
        }
        report.enrichment = summary;
        enriched
    }

    async fn outreach_phase(&self, report: &mut RunReport) -> Result<OutreachReport> {
        if !self.config.pipeline.enable_outreach {
            return Ok(OutreachReport::NotRun {
                reason: "Outreach disabled".to_string(),
            });
        }
        if self.config.general.dry_run {
            info!("dry run, outreach skipped");
            return Ok(OutreachReport::NotRun {
                reason: "Dry run".to_string(),
            });
        }

        match self.outreach.schedule_daily_outreach().await {
            Ok(DailyOutreach::Skipped { reason }) => {
                info!(reason = %reason, "outreach skipped");
                Ok(OutreachReport::Ran(DailyOutreach::Skipped { reason }))
            }
            Ok(outcome) => Ok(OutreachReport::Ran(outcome)),
            Err(e) => {
                let message = e.to_string();
                if let Some(emergency) = self.escalate(message.clone()).await {
                    return Err(emergency);
                }
                error!(error = %message, "outreach failed");
                report.phase_error("outreach", message.clone());
                Ok(OutreachReport::NotRun { reason: message })
            }
        }
    }

    async fn log_daily_report(&self, report: &RunReport) {
        match self.store.stats(self.limiter.today()).await {
            Ok(stats) => info!(
                total_healers = stats.total_healers,
                new_today = report.discovery.total,
                contacted = report.outreach.sent(),
                responses = stats.responses_received,
                response_rate = stats.response_rate,
                "daily report"
            ),
            Err(e) => warn!(error = %e, "could not read stats for daily report"),
        }
    }
}
