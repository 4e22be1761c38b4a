//! Application state for one invocation.

use anyhow::Context;
use healer_core::AppConfig;
use healer_db::Database;
use healer_pipeline::Pipeline;
use std::sync::Arc;

/// The open database and the pipeline built over it.
pub struct AppState {
    /// Shared SQLite store
    pub db: Arc<Database>,
    /// Orchestrator for every command
    pub pipeline: Pipeline,
}

impl AppState {
    /// Open the database at the configured path, migrate it and wire the
    /// pipeline.
    ///
    /// Invalid configuration fails here, before any external action.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;

        let path = config
            .database_path()
            .context("failed to determine database path")?;
        tracing::info!("Database: {}", path.display());

        let db = Database::new(&path)
            .await
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        db.run_migrations()
            .await
            .context("failed to run database migrations")?;
        let db = Arc::new(db);

        let pipeline = match Pipeline::from_config(config, db.clone()).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                db.close().await;
                return Err(anyhow::Error::new(e).context("failed to initialize pipeline"));
            }
        };
        Ok(Self { db, pipeline })
    }

    /// State over an already-open database and pipeline.
    #[must_use]
    pub fn from_parts(db: Arc<Database>, pipeline: Pipeline) -> Self {
        Self { db, pipeline }
    }

    /// Close sources and the database. Runs on every exit path.
    pub async fn shutdown(mut self) {
        self.pipeline.cleanup().await;
        self.db.close().await;
    }
}
