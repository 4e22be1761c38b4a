//! Campaign log operations.

use crate::error::{DatabaseError, Result};
use crate::healers::{parse_ts, ts};
use chrono::{DateTime, Utc};
use healer_core::{CampaignRecord, DeliveryStatus, NewCampaign};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn row_to_campaign(row: &SqliteRow) -> Result<CampaignRecord> {
    let sent_at: String = row.get("sent_at");
    let delivery_status: String = row.get("delivery_status");
    let response_date: Option<String> = row.get("response_date");

    Ok(CampaignRecord {
        id: row.get("id"),
        healer_id: row.get("healer_id"),
        campaign_type: row.get("campaign_type"),
        sent_at: parse_ts(&sent_at)?,
        subject: row.get("subject"),
        template_used: row.get("template_used"),
        message_id: row.get("message_id"),
        delivery_status: DeliveryStatus::parse(&delivery_status)
            .map_err(|e| DatabaseError::Decode(e.to_string()))?,
        response_received: row.get::<i64, _>("response_received") != 0,
        response_text: row.get("response_text"),
        response_date: response_date.as_deref().map(parse_ts).transpose()?,
    })
}

/// Record an outreach send, stamped with the current time.
///
/// # Errors
/// Fails if `healer_id` does not reference a stored healer.
pub async fn log_campaign(pool: &SqlitePool, campaign: NewCampaign) -> Result<CampaignRecord> {
    let record = CampaignRecord {
        id: uuid::Uuid::new_v4().to_string(),
        healer_id: campaign.healer_id,
        campaign_type: campaign.campaign_type,
        sent_at: Utc::now(),
        subject: campaign.subject,
        template_used: campaign.template_used,
        message_id: campaign.message_id,
        delivery_status: campaign.delivery_status,
        response_received: false,
        response_text: None,
        response_date: None,
    };

    sqlx::query(
        "INSERT INTO campaigns (id, healer_id, campaign_type, sent_at, subject, template_used,
                                message_id, delivery_status, response_received)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)",
    )
    .bind(&record.id)
    .bind(&record.healer_id)
    .bind(&record.campaign_type)
    .bind(ts(&record.sent_at))
    .bind(&record.subject)
    .bind(&record.template_used)
    .bind(&record.message_id)
    .bind(record.delivery_status.as_str())
    .execute(pool)
    .await?;

    tracing::debug!(
        healer_id = %record.healer_id,
        campaign_type = %record.campaign_type,
        "logged campaign"
    );

    Ok(record)
}

/// Campaigns for one healer, oldest first.
pub async fn campaigns_for_healer(pool: &SqlitePool, healer_id: &str) -> Result<Vec<CampaignRecord>> {
    let rows = sqlx::query(
        "SELECT id, healer_id, campaign_type, sent_at, subject, template_used, message_id,
                delivery_status, response_received, response_text, response_date
         FROM campaigns WHERE healer_id = ? ORDER BY sent_at ASC",
    )
    .bind(healer_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_campaign).collect()
}

/// Mark a campaign as answered.
pub async fn record_response(
    pool: &SqlitePool,
    campaign_id: &str,
    response_text: Option<&str>,
    at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE campaigns
         SET response_received = 1, response_text = ?, response_date = ?, delivery_status = 'replied'
         WHERE id = ?",
    )
    .bind(response_text)
    .bind(ts(&at))
    .bind(campaign_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Campaign '{campaign_id}' not found"
        )));
    }

    Ok(())
}
