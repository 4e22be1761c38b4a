//! Healer Database Layer
//!
//! Provides `SQLite` persistence for healer records, outreach campaigns,
//! per-day rate-limit counters and key-value settings. Uses `SQLx` with
//! embedded migrations.
//!
//! # Architecture
//!
//! - **Migrations**: SQL migrations are embedded and versioned using `SQLx`
//! - **Connection Pooling**: WAL-mode file databases with up to 5 connections
//! - **Storage seams**: [`Database`] implements the `healer-core` store traits
//!
//! # Example
//!
//! ```ignore
//! use healer_db::Database;
//!
//! let db = Database::new("healers.db").await?;
//! db.run_migrations().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod campaigns;
pub mod connection;
pub mod error;
pub mod healers;
pub mod migrations;
pub mod rate_limits;
pub mod settings;
pub mod stats;

// Re-export commonly used types
pub use error::{DatabaseError, Result};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use healer_core::{
    ActionCount, CampaignRecord, CounterStore, HealerCandidate, HealerFilter, HealerStats,
    HealerStatus, HealerStore, NewCampaign, SettingsStore,
};
use std::path::Path;

/// High-level database handle.
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::SqlitePool,
}

impl Database {
    /// Open (or create) the database at `path`.
    ///
    /// Call [`Database::run_migrations`] before first use.
    ///
    /// # Errors
    /// Returns `DatabaseError::Open` if the file cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Open a migrated in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::new(":memory:").await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Database pool closed");
    }
}

#[async_trait]
impl SettingsStore for Database {
    async fn get_setting(&self, key: &str) -> healer_core::Result<Option<String>> {
        Ok(settings::get_setting(&self.pool, key).await?)
    }

    async fn set_setting(&self, key: &str, value: &str) -> healer_core::Result<()> {
        Ok(settings::set_setting(&self.pool, key, value).await?)
    }

    async fn delete_setting(&self, key: &str) -> healer_core::Result<()> {
        Ok(settings::delete_setting(&self.pool, key).await?)
    }
}

#[async_trait]
impl CounterStore for Database {
    async fn action_count(
        &self,
        platform: &str,
        action: &str,
        date: NaiveDate,
    ) -> healer_core::Result<u32> {
        Ok(rate_limits::action_count(&self.pool, platform, action, date).await?)
    }

    async fn increment_action(
        &self,
        platform: &str,
        action: &str,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> healer_core::Result<u32> {
        Ok(rate_limits::increment_action(&self.pool, platform, action, date, at).await?)
    }

    async fn counts_for_date(&self, date: NaiveDate) -> healer_core::Result<Vec<ActionCount>> {
        Ok(rate_limits::counts_for_date(&self.pool, date).await?)
    }
}

#[async_trait]
impl HealerStore for Database {
    async fn upsert_healer(&self, healer: &HealerCandidate) -> healer_core::Result<String> {
        Ok(healers::upsert_healer(&self.pool, healer).await?)
    }

    async fn get_healers(&self, filter: &HealerFilter) -> healer_core::Result<Vec<HealerCandidate>> {
        Ok(healers::get_healers(&self.pool, filter).await?)
    }

    async fn update_healer_status(
        &self,
        id: &str,
        status: HealerStatus,
        note: Option<&str>,
    ) -> healer_core::Result<()> {
        Ok(healers::update_healer_status(&self.pool, id, status, note).await?)
    }

    async fn log_campaign(&self, campaign: NewCampaign) -> healer_core::Result<CampaignRecord> {
        Ok(campaigns::log_campaign(&self.pool, campaign).await?)
    }

    async fn campaigns_for(&self, healer_id: &str) -> healer_core::Result<Vec<CampaignRecord>> {
        Ok(campaigns::campaigns_for_healer(&self.pool, healer_id).await?)
    }

    async fn stats(&self, today: NaiveDate) -> healer_core::Result<HealerStats> {
        Ok(stats::get_stats(&self.pool, today).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healer_core::{Confidence, HealerError, Settings};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_file_persists_between_opens() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("healers.db");

        let db = Database::new(&path).await.expect("open");
        db.run_migrations().await.expect("migrate");
        let mut healer = HealerCandidate::new("Sage Moon", "psychology_today");
        healer.email = Some("sage@moonreiki.com".to_string());
        healer.contact_confidence = Confidence::new(0.8);
        db.upsert_healer(&healer).await.expect("upsert");
        db.close().await;

        let reopened = Database::new(&path).await.expect("reopen");
        reopened.run_migrations().await.expect("migrate again");
        assert_eq!(reopened.get_schema_version().await.expect("version"), 1);
        let all = reopened
            .get_healers(&HealerFilter::default())
            .await
            .expect("get");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].email.as_deref(), Some("sage@moonreiki.com"));
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_settings_service_over_database() {
        let db = Arc::new(Database::in_memory().await.expect("create test database"));
        let settings = Settings::new(db.clone());

        assert_eq!(settings.current_week().await.expect("week"), 1);
        settings.set_current_week(3).await.expect("set week");
        assert_eq!(settings.current_week().await.expect("week"), 3);
        assert!(settings.weekend_mode().await.expect("weekend"));
    }

    #[tokio::test]
    async fn test_not_found_maps_to_core_error() {
        let db = Database::in_memory().await.expect("create test database");
        let result = db
            .update_healer_status("missing", HealerStatus::Responded, None)
            .await;
        assert!(matches!(result, Err(HealerError::NotFound(_))));
    }
}
