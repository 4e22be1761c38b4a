//! Healer record operations.
//!
//! CRUD for the `healers` table. List-valued fields are stored as JSON
//! arrays; timestamps as RFC 3339 strings so lexical order is time order.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use healer_core::store::merge_rediscovered;
use healer_core::{Confidence, HealerCandidate, HealerFilter, HealerStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const HEALER_COLUMNS: &str = "id, name, email, phone, additional_emails, additional_phones, \
     website, instagram, location, specialties, bio, years_experience, certifications, \
     profile_image_url, follower_count, engagement_rate, source_platform, contact_confidence, \
     status, discovered_at, last_contacted, response_received, notes";

/// Format a timestamp the way every table stores it.
pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{raw}': {e}")))
}

fn to_json(list: &[String]) -> Result<String> {
    serde_json::to_string(list).map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

fn from_json(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

fn row_to_healer(row: &SqliteRow) -> Result<HealerCandidate> {
    let status: String = row.get("status");
    let discovered_at: String = row.get("discovered_at");
    let last_contacted: Option<String> = row.get("last_contacted");
    let years: Option<i64> = row.get("years_experience");
    let followers: Option<i64> = row.get("follower_count");

    Ok(HealerCandidate {
        id: Some(row.get("id")),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        additional_emails: from_json(&row.get::<String, _>("additional_emails"))?,
        additional_phones: from_json(&row.get::<String, _>("additional_phones"))?,
        website: row.get("website"),
        instagram: row.get("instagram"),
        location: row.get("location"),
        specialties: from_json(&row.get::<String, _>("specialties"))?,
        bio: row.get("bio"),
        years_experience: years.and_then(|y| u32::try_from(y).ok()),
        certifications: from_json(&row.get::<String, _>("certifications"))?,
        profile_image_url: row.get("profile_image_url"),
        follower_count: followers.and_then(|f| u64::try_from(f).ok()),
        engagement_rate: row.get("engagement_rate"),
        source_platform: row.get("source_platform"),
        contact_confidence: Confidence::new(row.get("contact_confidence")),
        status: HealerStatus::parse(&status).map_err(|e| DatabaseError::Decode(e.to_string()))?,
        discovered_at: parse_ts(&discovered_at)?,
        last_contacted: last_contacted.as_deref().map(parse_ts).transpose()?,
        response_received: row.get::<i64, _>("response_received") != 0,
        notes: row.get("notes"),
    })
}

/// Insert a new healer record, assigning it a fresh id.
///
/// # Errors
/// Returns `DatabaseError::Duplicate` if the email already exists.
pub async fn insert_healer(pool: &SqlitePool, healer: &HealerCandidate) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    let followers = healer.follower_count.and_then(|f| i64::try_from(f).ok());

    sqlx::query(&format!(
        "INSERT INTO healers ({HEALER_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&id)
    .bind(&healer.name)
    .bind(&healer.email)
    .bind(&healer.phone)
    .bind(to_json(&healer.additional_emails)?)
    .bind(to_json(&healer.additional_phones)?)
    .bind(&healer.website)
    .bind(&healer.instagram)
    .bind(&healer.location)
    .bind(to_json(&healer.specialties)?)
    .bind(&healer.bio)
    .bind(healer.years_experience.map(i64::from))
    .bind(to_json(&healer.certifications)?)
    .bind(&healer.profile_image_url)
    .bind(followers)
    .bind(healer.engagement_rate)
    .bind(&healer.source_platform)
    .bind(healer.contact_confidence.value())
    .bind(healer.status.as_str())
    .bind(ts(&healer.discovered_at))
    .bind(healer.last_contacted.as_ref().map(ts))
    .bind(i32::from(healer.response_received))
    .bind(&healer.notes)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Overwrite every mutable column of an existing record.
async fn update_healer(pool: &SqlitePool, id: &str, healer: &HealerCandidate) -> Result<()> {
    let followers = healer.follower_count.and_then(|f| i64::try_from(f).ok());

    sqlx::query(
        "UPDATE healers SET
            name = ?, email = ?, phone = ?, additional_emails = ?, additional_phones = ?,
            website = ?, instagram = ?, location = ?, specialties = ?, bio = ?,
            years_experience = ?, certifications = ?, profile_image_url = ?, follower_count = ?,
            engagement_rate = ?, contact_confidence = ?, notes = ?
         WHERE id = ?",
    )
    .bind(&healer.name)
    .bind(&healer.email)
    .bind(&healer.phone)
    .bind(to_json(&healer.additional_emails)?)
    .bind(to_json(&healer.additional_phones)?)
    .bind(&healer.website)
    .bind(&healer.instagram)
    .bind(&healer.location)
    .bind(to_json(&healer.specialties)?)
    .bind(&healer.bio)
    .bind(healer.years_experience.map(i64::from))
    .bind(to_json(&healer.certifications)?)
    .bind(&healer.profile_image_url)
    .bind(followers)
    .bind(healer.engagement_rate)
    .bind(healer.contact_confidence.value())
    .bind(&healer.notes)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a healer by email.
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<HealerCandidate>> {
    let row = sqlx::query(&format!(
        "SELECT {HEALER_COLUMNS} FROM healers WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_healer).transpose()
}

/// Get a healer by id.
pub async fn get_healer(pool: &SqlitePool, id: &str) -> Result<Option<HealerCandidate>> {
    let row = sqlx::query(&format!("SELECT {HEALER_COLUMNS} FROM healers WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_healer).transpose()
}

/// Insert a healer, or merge it into the record with the same email.
///
/// The stored record keeps its id, status and `discovered_at`; its
/// confidence never decreases. Records without an email are always
/// inserted.
pub async fn upsert_healer(pool: &SqlitePool, healer: &HealerCandidate) -> Result<String> {
    let email = healer.email.as_deref().filter(|e| !e.is_empty());

    if let Some(email) = email {
        if let Some(existing) = find_by_email(pool, email).await? {
            let id = existing.id.clone().ok_or_else(|| {
                DatabaseError::Decode("stored healer without id".to_string())
            })?;
            let merged = merge_rediscovered(&existing, healer);
            update_healer(pool, &id, &merged).await?;
            tracing::debug!(healer_id = %id, "merged re-discovered healer");
            return Ok(id);
        }
    }

    insert_healer(pool, healer).await
}

/// Get healers matching `filter`, newest discoveries first.
pub async fn get_healers(pool: &SqlitePool, filter: &HealerFilter) -> Result<Vec<HealerCandidate>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {HEALER_COLUMNS} FROM healers WHERE 1 = 1"));

    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(platform) = &filter.source_platform {
        query.push(" AND source_platform = ").push_bind(platform.clone());
    }
    if let Some(min) = filter.min_confidence {
        query.push(" AND contact_confidence >= ").push_bind(min.value());
    }
    query.push(" ORDER BY discovered_at DESC");
    if let Some(limit) = filter.limit {
        query.push(" LIMIT ").push_bind(i64::from(limit));
    }

    let rows = query.build().fetch_all(pool).await?;
    rows.iter().map(row_to_healer).collect()
}

/// Move a healer to `status`, appending `note` to its notes.
///
/// Moving to `contacted` also stamps `last_contacted`.
pub async fn update_healer_status(
    pool: &SqlitePool,
    id: &str,
    status: HealerStatus,
    note: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE healers SET
            status = ?,
            notes = CASE
                WHEN ? IS NULL THEN notes
                WHEN notes IS NULL OR notes = '' THEN ?
                ELSE notes || ' ' || ?
            END,
            last_contacted = CASE WHEN ? = 'contacted' THEN ? ELSE last_contacted END
         WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(note)
    .bind(note)
    .bind(note)
    .bind(status.as_str())
    .bind(ts(&Utc::now()))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Healer '{id}' not found"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_test_db() -> Database {
        Database::in_memory().await.expect("create test database")
    }

    fn candidate(name: &str, email: Option<&str>, confidence: f64) -> HealerCandidate {
        let mut h = HealerCandidate::new(name, "psychology_today");
        h.email = email.map(str::to_string);
        h.contact_confidence = Confidence::new(confidence);
        h.specialties = vec!["Reiki".to_string()];
        h.follower_count = Some(1_200);
        h
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = setup_test_db().await;
        let mut healer = candidate("Luna Rivers", Some("luna@lunahealing.com"), 0.8);
        healer.additional_emails = vec!["bookings@lunahealing.com".to_string()];
        healer.years_experience = Some(7);

        let id = insert_healer(db.pool(), &healer).await.expect("insert");
        let stored = get_healer(db.pool(), &id)
            .await
            .expect("get")
            .expect("healer exists");

        assert_eq!(stored.name, "Luna Rivers");
        assert_eq!(stored.specialties, vec!["Reiki"]);
        assert_eq!(stored.additional_emails, vec!["bookings@lunahealing.com"]);
        assert_eq!(stored.years_experience, Some(7));
        assert_eq!(stored.follower_count, Some(1_200));
        assert_eq!(stored.status, HealerStatus::Discovered);
        assert_eq!(
            stored.discovered_at.timestamp_micros(),
            healer.discovered_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_plain_insert_rejects_duplicate_email() {
        let db = setup_test_db().await;
        let healer = candidate("A", Some("a@reiki.org"), 0.7);
        insert_healer(db.pool(), &healer).await.expect("first insert");

        let result = insert_healer(db.pool(), &healer).await;
        assert!(matches!(result, Err(DatabaseError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_upsert_merges_on_email() {
        let db = setup_test_db().await;
        let first = candidate("Luna", Some("luna@lunahealing.com"), 0.9);
        let id = upsert_healer(db.pool(), &first).await.expect("insert");
        update_healer_status(db.pool(), &id, HealerStatus::Contacted, Some("Sent initial_outreach email"))
            .await
            .expect("status");

        let mut again = candidate("Luna Rivers", Some("luna@lunahealing.com"), 0.6);
        again.website = Some("https://lunahealing.com".to_string());
        let same_id = upsert_healer(db.pool(), &again).await.expect("upsert");
        assert_eq!(same_id, id);

        let all = get_healers(db.pool(), &HealerFilter::default())
            .await
            .expect("get");
        assert_eq!(all.len(), 1);
        let stored = &all[0];
        assert_eq!(stored.name, "Luna Rivers");
        assert_eq!(stored.website.as_deref(), Some("https://lunahealing.com"));
        assert_eq!(stored.status, HealerStatus::Contacted);
        assert!((stored.contact_confidence.value() - 0.9).abs() < 1e-9);
        assert_eq!(stored.notes.as_deref(), Some("Sent initial_outreach email"));
    }

    #[tokio::test]
    async fn test_filters_and_order() {
        let db = setup_test_db().await;
        let mut older = candidate("Older", Some("older@reiki.org"), 0.9);
        older.discovered_at = Utc::now() - chrono::Duration::days(2);
        let newer = candidate("Newer", Some("newer@reiki.org"), 0.9);
        let mut low = candidate("Low", Some("low@reiki.org"), 0.3);
        low.source_platform = "instagram".to_string();

        for h in [&older, &newer, &low] {
            upsert_healer(db.pool(), h).await.expect("insert");
        }

        let eligible = get_healers(
            db.pool(),
            &HealerFilter::default()
                .with_status(HealerStatus::Discovered)
                .with_min_confidence(0.6),
        )
        .await
        .expect("get");
        let names: Vec<_> = eligible.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);

        let instagram = get_healers(db.pool(), &HealerFilter::default().with_platform("instagram"))
            .await
            .expect("get");
        assert_eq!(instagram.len(), 1);

        let limited = get_healers(db.pool(), &HealerFilter::default().with_limit(1))
            .await
            .expect("get");
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_stamps_last_contacted() {
        let db = setup_test_db().await;
        let id = insert_healer(db.pool(), &candidate("A", Some("a@reiki.org"), 0.7))
            .await
            .expect("insert");

        update_healer_status(db.pool(), &id, HealerStatus::Contacted, None)
            .await
            .expect("update");

        let stored = get_healer(db.pool(), &id).await.expect("get").expect("exists");
        assert_eq!(stored.status, HealerStatus::Contacted);
        assert!(stored.last_contacted.is_some());
        assert_eq!(stored.notes, None);
    }

    #[tokio::test]
    async fn test_update_status_missing_healer() {
        let db = setup_test_db().await;
        let result = update_healer_status(db.pool(), "missing", HealerStatus::Contacted, None).await;
        match result {
            Err(DatabaseError::NotFoundWithMessage(msg)) => {
                assert!(msg.contains("Healer 'missing' not found"));
            }
            other => panic!("Expected NotFoundWithMessage error, got {other:?}"),
        }
    }
}
