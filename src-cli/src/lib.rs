//! Healer Search command-line shell.
//!
//! This is the thin application shell that parses commands, wires state and
//! prints results. Core business logic lives in the `crates/` directory.

pub mod cli;
pub mod commands;
pub mod output;
pub mod state;

use cli::Cli;
use healer_core::AppConfig;
use state::AppState;
use tracing::info;

/// Initialize tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,healer=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Load configuration, applying the environment and command-line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    config.apply_env(|key| std::env::var(key).ok());
    if cli.dry_run {
        config.general.dry_run = true;
    }
    Ok(config)
}

/// Execute one invocation. Sources and the database are closed on every
/// path, including failures.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    info!("Starting Healer Search v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    if config.general.dry_run {
        info!("Dry run: no email will be sent");
    }

    let mut state = AppState::open(config).await?;
    let result = commands::execute(&mut state, cli.command, cli.json).await;
    state.shutdown().await;
    result
}
