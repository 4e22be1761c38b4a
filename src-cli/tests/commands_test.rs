//! Integration tests for command parsing and handlers.

use clap::Parser;
use healer_cli::cli::{Cli, Command, FormatArg, Toggle};
use healer_cli::commands::execute;
use healer_cli::state::AppState;
use healer_core::{
    AppConfig, DelayConfig, HealerCandidate, HealerStore, PageFetcher, Settings, StaticFetcher,
};
use healer_db::Database;
use healer_outreach::RecordingTransport;
use healer_pipeline::Pipeline;
use healer_ratelimit::{RateLimiter, SeededDelays};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to build state over a migrated in-memory database with no sources.
async fn create_test_state(dir: &TempDir) -> AppState {
    let db = Arc::new(Database::in_memory().await.expect("open database"));
    let settings = Settings::new(db.clone());
    settings.seed_defaults().await.expect("seed settings");

    let mut config = AppConfig::default();
    config.general.dry_run = true;
    config.export.dir = dir.path().join("exports");
    config.delays = DelayConfig::none();

    let limiter = Arc::new(
        RateLimiter::new(db.clone(), settings, config.rate_limits.clone())
            .with_delays(Arc::new(SeededDelays::new(DelayConfig::none()))),
    );
    let fetcher: Arc<dyn PageFetcher> = Arc::new(StaticFetcher::new());
    let pipeline = Pipeline::new(
        config,
        db.clone(),
        limiter,
        fetcher,
        Arc::new(RecordingTransport::new()),
    )
    .expect("pipeline");

    AppState::from_parts(db, pipeline)
}

#[test]
fn test_parse_commands() {
    let cli = Cli::try_parse_from(["healer-search", "run"]).expect("parse run");
    assert_eq!(cli.command, Command::Run);
    assert!(!cli.dry_run);

    let cli = Cli::try_parse_from(["healer-search", "--dry-run", "export", "csv"])
        .expect("parse export");
    assert!(cli.dry_run);
    assert_eq!(
        cli.command,
        Command::Export {
            format: Some(FormatArg::Csv)
        }
    );

    let cli = Cli::try_parse_from(["healer-search", "week", "4"]).expect("parse week");
    assert_eq!(cli.command, Command::Week { week: 4 });

    let cli = Cli::try_parse_from(["healer-search", "approval", "off"]).expect("parse approval");
    assert_eq!(cli.command, Command::Approval { state: Toggle::Off });
}

#[test]
fn test_parse_rejects_bad_input() {
    assert!(Cli::try_parse_from(["healer-search", "week", "0"]).is_err());
    assert!(Cli::try_parse_from(["healer-search", "export", "pdf"]).is_err());
    assert!(Cli::try_parse_from(["healer-search", "launch"]).is_err());
    assert!(Cli::try_parse_from(["healer-search"]).is_err());
    assert!(Cli::try_parse_from(["healer-search", "approval", "maybe"]).is_err());
}

#[tokio::test]
async fn test_week_then_status() {
    let dir = TempDir::new().expect("create temp dir");
    let mut state = create_test_state(&dir).await;

    let text = execute(&mut state, Command::Week { week: 4 }, false)
        .await
        .expect("week");
    assert!(text.contains("daily outreach limit is now 14"));

    let text = execute(&mut state, Command::Status, false)
        .await
        .expect("status");
    assert!(text.contains("Week 4: daily limit 14"));
    assert!(text.contains("Dry run:          on"));

    let json = execute(&mut state, Command::Status, true)
        .await
        .expect("status json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["limiter"]["week"], 4);

    state.shutdown().await;
}

#[tokio::test]
async fn test_resume_reports_cleared_stop() {
    let dir = TempDir::new().expect("create temp dir");
    let mut state = create_test_state(&dir).await;

    let text = execute(&mut state, Command::Resume, false)
        .await
        .expect("resume");
    assert!(text.contains("No emergency stop was active"));

    state
        .pipeline
        .limiter()
        .emergency_stop("Rate limit exceeded on instagram")
        .await
        .expect("latch");
    let text = execute(&mut state, Command::Status, false)
        .await
        .expect("status");
    assert!(text.starts_with("EMERGENCY STOP ACTIVE"));

    let text = execute(&mut state, Command::Resume, false)
        .await
        .expect("resume");
    assert!(text.contains("was: Rate limit exceeded on instagram"));

    state.shutdown().await;
}

#[tokio::test]
async fn test_export_csv() {
    let dir = TempDir::new().expect("create temp dir");
    let mut state = create_test_state(&dir).await;

    let mut healer = HealerCandidate::new("Willow Moon", "psychology_today");
    healer.email = Some("willow@moonhealing.com".to_string());
    state.db.upsert_healer(&healer).await.expect("upsert");

    let text = execute(
        &mut state,
        Command::Export {
            format: Some(FormatArg::Csv),
        },
        false,
    )
    .await
    .expect("export");
    assert!(text.starts_with("Exported 1 healers to"));
    assert!(text.contains("Summary:"));

    state.shutdown().await;
}

#[tokio::test]
async fn test_outreach_in_dry_run_is_skipped() {
    let dir = TempDir::new().expect("create temp dir");
    let mut state = create_test_state(&dir).await;

    let text = execute(&mut state, Command::Outreach, false)
        .await
        .expect("outreach");
    assert_eq!(text, "Outreach: skipped (Dry run)\n");

    state.shutdown().await;
}

#[tokio::test]
async fn test_approval_toggles_the_send_gate() {
    let dir = TempDir::new().expect("create temp dir");
    let mut state = create_test_state(&dir).await;

    let text = execute(&mut state, Command::Status, false)
        .await
        .expect("status");
    assert!(text.contains("Manual approval:  on"));

    let text = execute(&mut state, Command::Approval { state: Toggle::Off }, false)
        .await
        .expect("approval off");
    assert!(text.starts_with("Manual approval is off"));
    let text = execute(&mut state, Command::Status, false)
        .await
        .expect("status");
    assert!(text.contains("Manual approval:  off"));
    assert!(!state
        .pipeline
        .limiter()
        .is_manual_approval_required()
        .await
        .expect("read approval"));

    execute(&mut state, Command::Approval { state: Toggle::On }, false)
        .await
        .expect("approval on");
    let json = execute(&mut state, Command::Status, true)
        .await
        .expect("status json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["limiter"]["manual_approval_required"], true);

    state.shutdown().await;
}
