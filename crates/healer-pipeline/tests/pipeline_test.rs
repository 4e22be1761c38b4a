//! End-to-end pipeline runs over the in-memory store and canned sources.

use async_trait::async_trait;
use chrono::NaiveDate;
use healer_core::{
    AppConfig, Confidence, DelayConfig, HealerCandidate, HealerFilter, HealerStatus, HealerStore,
    MemoryStore, PageFetcher, Settings, StaticFetcher,
};
use healer_discovery::{DiscoveryError, DiscoverySource};
use healer_outreach::{DailyOutreach, RecordingTransport};
use healer_pipeline::{OutreachReport, Pipeline, PipelineError, RunOutcome};
use healer_ratelimit::{FixedClock, RateLimiter, SeededDelays};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

enum Canned {
    Found(Vec<HealerCandidate>),
    Broken(&'static str),
    Blocked,
}

struct FakeSource {
    name: &'static str,
    canned: Canned,
    discovers: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl DiscoverySource for FakeSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn discover(&mut self) -> healer_discovery::Result<Vec<HealerCandidate>> {
        self.discovers.fetch_add(1, Ordering::SeqCst);
        match &self.canned {
            Canned::Found(found) => Ok(found.clone()),
            Canned::Broken(reason) => Err(DiscoveryError::ValidationError {
                directory_id: self.name.to_string(),
                reason: (*reason).to_string(),
            }),
            Canned::Blocked => Err(DiscoveryError::Blocked {
                platform: self.name.to_string(),
                reason: "captcha page".to_string(),
            }),
        }
    }

    async fn close(&mut self) -> healer_discovery::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    _dir: TempDir,
    store: Arc<MemoryStore>,
    limiter: Arc<RateLimiter>,
    transport: Arc<RecordingTransport>,
    discovers: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    pipeline: Pipeline,
}

impl Harness {
    fn source(&self, name: &'static str, canned: Canned) -> Box<dyn DiscoverySource> {
        Box::new(FakeSource {
            name,
            canned,
            discovers: self.discovers.clone(),
            closes: self.closes.clone(),
        })
    }

    fn with_sources(mut self, build: impl FnOnce(&Self) -> Vec<Box<dyn DiscoverySource>>) -> Self {
        let sources = build(&self);
        self.pipeline = self.pipeline.with_sources(sources);
        self
    }
}

fn candidates(prefix: &str, n: usize) -> Vec<HealerCandidate> {
    (0..n)
        .map(|i| {
            let mut h = HealerCandidate::new(format!("{prefix} Healer {i}"), "psychology_today");
            h.email = Some(format!("{prefix}{i}@{prefix}healing.com").to_lowercase());
            h.contact_confidence = Confidence::new(0.7);
            h.specialties = vec!["Reiki".to_string()];
            h
        })
        .collect()
}

// March 2026: the 3rd is a Tuesday, the 7th a Saturday
async fn harness(day: u32, configure: impl FnOnce(&mut AppConfig)) -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let mut config = AppConfig::default();
    config.outreach.smtp.username = Some("outreach@commonsoul.com".to_string());
    config.outreach.smtp.password = Some("app-password".to_string());
    config.export.dir = dir.path().join("exports");
    config.delays = DelayConfig::none();
    configure(&mut config);

    let store = Arc::new(MemoryStore::with_default_settings());
    let settings = Settings::new(store.clone());
    settings
        .set_manual_approval(false)
        .await
        .expect("disable approval");

    let at = NaiveDate::from_ymd_opt(2026, 3, day)
        .and_then(|d| d.and_hms_opt(11, 0, 0))
        .expect("valid datetime");
    let limiter = Arc::new(
        RateLimiter::new(store.clone(), settings, config.rate_limits.clone())
            .with_clock(Arc::new(FixedClock::new(at)))
            .with_delays(Arc::new(SeededDelays::new(DelayConfig::none()))),
    );
    let fetcher: Arc<dyn PageFetcher> = Arc::new(StaticFetcher::new());
    let transport = Arc::new(RecordingTransport::new());

    let pipeline = Pipeline::new(
        config,
        store.clone(),
        limiter.clone(),
        fetcher,
        transport.clone(),
    )
    .expect("pipeline");

    Harness {
        _dir: dir,
        store,
        limiter,
        transport,
        discovers: Arc::new(AtomicUsize::new(0)),
        closes: Arc::new(AtomicUsize::new(0)),
        pipeline,
    }
}

#[tokio::test]
async fn test_emergency_stop_refuses_run() {
    let mut h = harness(3, |_| {})
        .await
        .with_sources(|h| vec![h.source("psychology_today", Canned::Found(candidates("a", 2)))]);
    h.limiter
        .emergency_stop("account banned")
        .await
        .expect("latch");

    let report = h.pipeline.run_full().await.expect("run");

    assert_eq!(
        report.outcome,
        RunOutcome::Refused {
            reason: "account banned".to_string()
        }
    );
    assert_eq!(h.discovers.load(Ordering::SeqCst), 0);
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_weekend_skips_run() {
    let mut h = harness(7, |_| {})
        .await
        .with_sources(|h| vec![h.source("psychology_today", Canned::Found(candidates("a", 2)))]);

    let report = h.pipeline.run_full().await.expect("run");

    assert_eq!(
        report.outcome,
        RunOutcome::Skipped {
            reason: "Weekend mode active".to_string()
        }
    );
    assert_eq!(h.discovers.load(Ordering::SeqCst), 0);
    assert!(!report.completed());
}

#[tokio::test]
async fn test_full_run_survives_failing_source() {
    let mut h = harness(3, |_| {}).await.with_sources(|h| {
        vec![
            h.source("broken_directory", Canned::Broken("listing selector matched nothing")),
            h.source("psychology_today", Canned::Found(candidates("Luna", 7))),
        ]
    });

    let report = h.pipeline.run_full().await.expect("run");

    assert!(report.completed());
    assert_eq!(h.closes.load(Ordering::SeqCst), 2);
    assert_eq!(report.discovery.total, 7);
    assert_eq!(report.discovery.sources.len(), 2);
    assert!(report.discovery.sources[0].error.is_some());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].phase, "discovery");
    assert_eq!(report.enrichment.saved, 7);

    // Week 1 of the ramp allows five
    assert_eq!(report.outreach.sent(), 5);
    assert!(matches!(
        &report.outreach,
        OutreachReport::Ran(DailyOutreach::Ran { daily_target: 5, available: 7, .. })
    ));
    assert_eq!(h.transport.sent().len(), 5);

    let contacted = h
        .store
        .get_healers(&HealerFilter::default().with_status(HealerStatus::Contacted))
        .await
        .expect("read back");
    assert_eq!(contacted.len(), 5);

    let export = report.export.expect("export ran");
    assert_eq!(export.record_count, 2);
    assert!(export.file_path.exists());
}

#[tokio::test]
async fn test_blocked_source_latches_emergency() {
    let mut h = harness(3, |_| {}).await.with_sources(|h| {
        vec![
            h.source("instagram", Canned::Blocked),
            h.source("psychology_today", Canned::Found(candidates("a", 3))),
        ]
    });

    let err = h.pipeline.run_full().await.expect_err("blocked run fails");
    assert!(matches!(err, PipelineError::Emergency { .. }));
    assert_eq!(h.discovers.load(Ordering::SeqCst), 1);
    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    assert!(h.transport.sent().is_empty());

    let stop = h
        .limiter
        .is_emergency_stopped()
        .await
        .expect("read stop")
        .expect("stop latched");
    assert!(stop.reason.contains("captcha"));

    let report = h.pipeline.run_full().await.expect("second run");
    assert!(matches!(report.outcome, RunOutcome::Refused { .. }));
    assert_eq!(h.discovers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dry_run_saves_without_sending() {
    let mut h = harness(3, |c| c.general.dry_run = true)
        .await
        .with_sources(|h| vec![h.source("psychology_today", Canned::Found(candidates("a", 4)))]);

    let report = h.pipeline.run_full().await.expect("run");

    assert_eq!(report.enrichment.saved, 4);
    assert_eq!(
        report.outreach,
        OutreachReport::NotRun {
            reason: "Dry run".to_string()
        }
    );
    assert!(h.transport.sent().is_empty());
    assert_eq!(h.store.campaign_count().await, 0);
}

#[tokio::test]
async fn test_discovery_only_persists() {
    let mut h = harness(3, |_| {})
        .await
        .with_sources(|h| vec![h.source("psychology_today", Canned::Found(candidates("a", 3)))]);

    let found = h.pipeline.run_discovery_only().await.expect("discover");

    assert_eq!(found.len(), 3);
    assert_eq!(
        h.store
            .get_healers(&HealerFilter::default())
            .await
            .expect("read back")
            .len(),
        3
    );
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_outreach_only_when_disabled() {
    let h = harness(3, |c| c.pipeline.enable_outreach = false).await;

    let err = h
        .pipeline
        .run_outreach_only()
        .await
        .expect_err("outreach disabled");
    assert!(matches!(err, PipelineError::OutreachDisabled));
}

#[tokio::test]
async fn test_outreach_only_refused_while_stopped() {
    let h = harness(3, |_| {}).await;
    h.limiter.emergency_stop("manual").await.expect("latch");

    let err = h
        .pipeline
        .run_outreach_only()
        .await
        .expect_err("stopped");
    assert!(matches!(err, PipelineError::EmergencyStopActive { reason } if reason == "manual"));
}

#[tokio::test]
async fn test_week_and_resume() {
    let h = harness(3, |_| {}).await;

    assert_eq!(h.pipeline.advance_week(4).await.expect("advance"), 14);
    assert!(h.pipeline.advance_week(0).await.is_err());

    h.limiter.emergency_stop("rate limit hit").await.expect("latch");
    h.pipeline.resume().await.expect("resume");
    assert!(h
        .limiter
        .is_emergency_stopped()
        .await
        .expect("read stop")
        .is_none());

    let status = h.pipeline.status().await.expect("status");
    assert_eq!(status.limiter.week, 4);
    assert!(!status.dry_run);
    assert!(status.sources.is_empty());
}

#[tokio::test]
async fn test_cleanup_closes_every_source() {
    let mut h = harness(3, |_| {}).await.with_sources(|h| {
        vec![
            h.source("a", Canned::Found(Vec::new())),
            h.source("b", Canned::Found(Vec::new())),
        ]
    });

    h.pipeline.cleanup().await;
    h.pipeline.cleanup().await;

    assert_eq!(h.closes.load(Ordering::SeqCst), 4);
}
