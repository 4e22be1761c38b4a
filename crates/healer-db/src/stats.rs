//! Aggregate statistics for status reporting.

use crate::error::Result;
use crate::rate_limits::counts_for_date;
use chrono::NaiveDate;
use healer_core::HealerStats;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

async fn grouped_counts(pool: &SqlitePool, column: &str) -> Result<BTreeMap<String, u64>> {
    let rows = sqlx::query(&format!(
        "SELECT {column} AS k, COUNT(*) AS n FROM healers GROUP BY {column}"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let n: i64 = row.get("n");
            (row.get::<String, _>("k"), u64::try_from(n).unwrap_or(0))
        })
        .collect())
}

/// Collect totals by status and platform, today's counters and the
/// campaign response rate.
pub async fn get_stats(pool: &SqlitePool, today: NaiveDate) -> Result<HealerStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM healers")
        .fetch_one(pool)
        .await?;
    let (sent, responses): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(response_received), 0) FROM campaigns",
    )
    .fetch_one(pool)
    .await?;

    let campaigns_sent = u64::try_from(sent).unwrap_or(0);
    let responses_received = u64::try_from(responses).unwrap_or(0);

    Ok(HealerStats {
        total_healers: u64::try_from(total).unwrap_or(0),
        by_status: grouped_counts(pool, "status").await?,
        by_platform: grouped_counts(pool, "source_platform").await?,
        todays_activity: counts_for_date(pool, today).await?,
        campaigns_sent,
        responses_received,
        response_rate: HealerStats::rate(responses_received, campaigns_sent),
    })
}
