//! Per-day action counters.
//!
//! One row per `(platform, action_type, date)`. Dates are stored as
//! `YYYY-MM-DD`, so a new day starts a fresh row at zero.

use crate::error::Result;
use crate::healers::ts;
use chrono::{DateTime, NaiveDate, Utc};
use healer_core::ActionCount;
use sqlx::{Row, SqlitePool};

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Actions recorded for `(platform, action_type)` on `date`.
pub async fn action_count(
    pool: &SqlitePool,
    platform: &str,
    action_type: &str,
    date: NaiveDate,
) -> Result<u32> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT action_count FROM rate_limits WHERE platform = ? AND action_type = ? AND date = ?",
    )
    .bind(platform)
    .bind(action_type)
    .bind(day(date))
    .fetch_optional(pool)
    .await?
    .unwrap_or(0);

    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Record one action and return the day's new count.
pub async fn increment_action(
    pool: &SqlitePool,
    platform: &str,
    action_type: &str,
    date: NaiveDate,
    at: DateTime<Utc>,
) -> Result<u32> {
    let count = sqlx::query_scalar::<_, i64>(
        "INSERT INTO rate_limits (platform, action_type, action_count, date, last_action)
         VALUES (?, ?, 1, ?, ?)
         ON CONFLICT(platform, action_type, date) DO UPDATE SET
             action_count = action_count + 1,
             last_action = excluded.last_action
         RETURNING action_count",
    )
    .bind(platform)
    .bind(action_type)
    .bind(day(date))
    .bind(ts(&at))
    .fetch_one(pool)
    .await?;

    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Every counter recorded on `date`.
pub async fn counts_for_date(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<ActionCount>> {
    let rows = sqlx::query(
        "SELECT platform, action_type, action_count FROM rate_limits
         WHERE date = ? ORDER BY platform, action_type",
    )
    .bind(day(date))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ActionCount {
            platform: row.get("platform"),
            action_type: row.get("action_type"),
            count: u32::try_from(row.get::<i64, _>("action_count")).unwrap_or(u32::MAX),
        })
        .collect())
}
