//! Persistence seams.
//!
//! The rate limiter, settings service, outreach engine and orchestrator talk
//! to storage only through these traits. `healer-db` implements them on
//! SQLite; [`MemoryStore`] implements them in process for dry runs and tests.

use crate::error::{HealerError, Result};
use crate::types::{CampaignRecord, HealerCandidate, HealerFilter, HealerStatus, NewCampaign};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// String-keyed settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a setting.
    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a setting.
    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a setting.
    async fn delete_setting(&self, key: &str) -> Result<()>;
}

/// Durable per-day action counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Actions recorded for `(platform, action)` on `date`.
    async fn action_count(&self, platform: &str, action: &str, date: NaiveDate) -> Result<u32>;

    /// Record one action and return the new count for the day.
    async fn increment_action(
        &self,
        platform: &str,
        action: &str,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<u32>;

    /// All counters for a day.
    async fn counts_for_date(&self, date: NaiveDate) -> Result<Vec<ActionCount>>;
}

/// Healer and campaign storage.
#[async_trait]
pub trait HealerStore: Send + Sync {
    /// Insert a healer, or merge into the existing record with the same email.
    ///
    /// Returns the stored record's id.
    async fn upsert_healer(&self, healer: &HealerCandidate) -> Result<String>;

    /// Read healers, newest discoveries first.
    async fn get_healers(&self, filter: &HealerFilter) -> Result<Vec<HealerCandidate>>;

    /// Move a healer to a new status, appending `note` to its notes.
    async fn update_healer_status(
        &self,
        id: &str,
        status: HealerStatus,
        note: Option<&str>,
    ) -> Result<()>;

    /// Record an outreach send.
    async fn log_campaign(&self, campaign: NewCampaign) -> Result<CampaignRecord>;

    /// Campaigns sent to one healer, oldest first.
    async fn campaigns_for(&self, healer_id: &str) -> Result<Vec<CampaignRecord>>;

    /// Aggregate counts for status reporting.
    async fn stats(&self, today: NaiveDate) -> Result<HealerStats>;
}

/// One day's counter for a `(platform, action)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    /// Platform tag
    pub platform: String,
    /// Action type
    pub action_type: String,
    /// Count for the day
    pub count: u32,
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealerStats {
    /// Total healer records
    pub total_healers: u64,
    /// Healers per status
    pub by_status: BTreeMap<String, u64>,
    /// Healers per source platform
    pub by_platform: BTreeMap<String, u64>,
    /// Counters recorded today
    pub todays_activity: Vec<ActionCount>,
    /// Total campaign records
    pub campaigns_sent: u64,
    /// Campaigns with a response
    pub responses_received: u64,
    /// Responses as a percentage of campaigns, rounded
    pub response_rate: u32,
}

impl HealerStats {
    /// Rounded response percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn rate(responses: u64, sent: u64) -> u32 {
        if sent == 0 {
            return 0;
        }
        ((responses as f64 / sent as f64) * 100.0).round() as u32
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    settings: HashMap<String, String>,
    counters: BTreeMap<(String, String, NaiveDate), u32>,
    healers: Vec<HealerCandidate>,
    campaigns: Vec<CampaignRecord>,
}

/// In-process implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the default settings.
    #[must_use]
    pub fn with_default_settings() -> Self {
        let mut state = MemoryState::default();
        for (key, value) in crate::settings::DEFAULT_SETTINGS {
            state.settings.insert((*key).to_string(), (*value).to_string());
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Number of stored campaign records.
    pub async fn campaign_count(&self) -> usize {
        self.state.read().await.campaigns.len()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.read().await.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.state
            .write()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> Result<()> {
        self.state.write().await.settings.remove(key);
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn action_count(&self, platform: &str, action: &str, date: NaiveDate) -> Result<u32> {
        let key = (platform.to_string(), action.to_string(), date);
        Ok(self
            .state
            .read()
            .await
            .counters
            .get(&key)
            .copied()
            .unwrap_or(0))
    }

    async fn increment_action(
        &self,
        platform: &str,
        action: &str,
        date: NaiveDate,
        _at: DateTime<Utc>,
    ) -> Result<u32> {
        let key = (platform.to_string(), action.to_string(), date);
        let mut state = self.state.write().await;
        let count = state.counters.entry(key).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn counts_for_date(&self, date: NaiveDate) -> Result<Vec<ActionCount>> {
        Ok(self
            .state
            .read()
            .await
            .counters
            .iter()
            .filter(|((_, _, d), _)| *d == date)
            .map(|((platform, action_type, _), count)| ActionCount {
                platform: platform.clone(),
                action_type: action_type.clone(),
                count: *count,
            })
            .collect())
    }
}

/// Merge a re-discovered record into the stored one.
///
/// Identity, lifecycle status and `discovered_at` stay with the stored
/// record; confidence never goes down; new non-empty fields win.
#[must_use]
pub fn merge_rediscovered(existing: &HealerCandidate, incoming: &HealerCandidate) -> HealerCandidate {
    fn pick<T: Clone>(new: &Option<T>, old: &Option<T>) -> Option<T> {
        new.clone().or_else(|| old.clone())
    }
    fn pick_list(new: &[String], old: &[String]) -> Vec<String> {
        if new.is_empty() {
            old.to_vec()
        } else {
            new.to_vec()
        }
    }

    HealerCandidate {
        id: existing.id.clone(),
        name: if incoming.name.trim().is_empty() {
            existing.name.clone()
        } else {
            incoming.name.clone()
        },
        email: pick(&incoming.email, &existing.email),
        phone: pick(&incoming.phone, &existing.phone),
        additional_emails: pick_list(&incoming.additional_emails, &existing.additional_emails),
        additional_phones: pick_list(&incoming.additional_phones, &existing.additional_phones),
        website: pick(&incoming.website, &existing.website),
        instagram: pick(&incoming.instagram, &existing.instagram),
        location: pick(&incoming.location, &existing.location),
        specialties: pick_list(&incoming.specialties, &existing.specialties),
        bio: pick(&incoming.bio, &existing.bio),
        years_experience: incoming.years_experience.or(existing.years_experience),
        certifications: pick_list(&incoming.certifications, &existing.certifications),
        profile_image_url: pick(&incoming.profile_image_url, &existing.profile_image_url),
        follower_count: incoming.follower_count.or(existing.follower_count),
        engagement_rate: incoming.engagement_rate.or(existing.engagement_rate),
        source_platform: existing.source_platform.clone(),
        contact_confidence: existing.contact_confidence.max(incoming.contact_confidence),
        status: existing.status,
        discovered_at: existing.discovered_at,
        last_contacted: existing.last_contacted,
        response_received: existing.response_received,
        notes: merge_notes(existing.notes.as_deref(), incoming.notes.as_deref()),
    }
}

fn merge_notes(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    match (existing, incoming) {
        (Some(old), Some(new)) if old.contains(new.trim()) => Some(old.to_string()),
        (Some(old), Some(new)) => Some(format!("{} {}", old.trim_end(), new.trim())),
        (old, new) => old.or(new).map(str::to_string),
    }
}

#[async_trait]
impl HealerStore for MemoryStore {
    async fn upsert_healer(&self, healer: &HealerCandidate) -> Result<String> {
        let mut state = self.state.write().await;

        if let Some(email) = healer.email.as_deref().filter(|e| !e.is_empty()) {
            if let Some(existing) = state
                .healers
                .iter_mut()
                .find(|h| h.email.as_deref() == Some(email))
            {
                let merged = merge_rediscovered(existing, healer);
                let id = merged.id.clone().unwrap_or_default();
                *existing = merged;
                return Ok(id);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut stored = healer.clone();
        stored.id = Some(id.clone());
        state.healers.push(stored);
        Ok(id)
    }

    async fn get_healers(&self, filter: &HealerFilter) -> Result<Vec<HealerCandidate>> {
        let state = self.state.read().await;
        let mut healers: Vec<_> = state
            .healers
            .iter()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect();
        healers.sort_by(|a, b| b.discovered_at.cmp(&a.discovered_at));
        if let Some(limit) = filter.limit {
            healers.truncate(limit as usize);
        }
        Ok(healers)
    }

    async fn update_healer_status(
        &self,
        id: &str,
        status: HealerStatus,
        note: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let healer = state
            .healers
            .iter_mut()
            .find(|h| h.id.as_deref() == Some(id))
            .ok_or_else(|| HealerError::NotFound(format!("healer '{id}'")))?;

        healer.status = status;
        if status == HealerStatus::Contacted {
            healer.last_contacted = Some(Utc::now());
        }
        if let Some(note) = note {
            healer.append_note(note);
        }
        Ok(())
    }

    async fn log_campaign(&self, campaign: NewCampaign) -> Result<CampaignRecord> {
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
        self.state.write().await.campaigns.push(record.clone());
        Ok(record)
    }

    async fn campaigns_for(&self, healer_id: &str) -> Result<Vec<CampaignRecord>> {
        Ok(self
            .state
            .read()
            .await
            .campaigns
            .iter()
            .filter(|c| c.healer_id == healer_id)
            .cloned()
            .collect())
    }

    async fn stats(&self, today: NaiveDate) -> Result<HealerStats> {
        let todays_activity = self.counts_for_date(today).await?;
        let state = self.state.read().await;

        let mut by_status = BTreeMap::new();
        let mut by_platform = BTreeMap::new();
        for healer in &state.healers {
            *by_status.entry(healer.status.to_string()).or_insert(0) += 1;
            *by_platform
                .entry(healer.source_platform.clone())
                .or_insert(0) += 1;
        }

        let campaigns_sent = state.campaigns.len() as u64;
        let responses_received = state
            .campaigns
            .iter()
            .filter(|c| c.response_received)
            .count() as u64;

        Ok(HealerStats {
            total_healers: state.healers.len() as u64,
            by_status,
            by_platform,
            todays_activity,
            campaigns_sent,
            responses_received,
            response_rate: HealerStats::rate(responses_received, campaigns_sent),
        })
    }
}
