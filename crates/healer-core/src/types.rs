//! Shared types used across the healer search pipeline.
//!
//! This module defines the candidate record that flows from discovery through
//! enrichment, persistence, outreach and export, plus the small enums and
//! newtypes that keep that record honest.

use crate::error::HealerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a healer candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealerStatus {
    /// Found by a discovery source, not yet contacted
    #[default]
    Discovered,
    /// Outreach email sent
    Contacted,
    /// Replied to outreach
    Responded,
    /// Expressed interest in joining
    Interested,
    /// Started an application
    Applied,
    /// Fully onboarded
    Onboarded,
    /// Withdrawn out-of-band
    Cancelled,
    /// Suspended out-of-band
    Suspended,
}

impl HealerStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Discovered,
        Self::Contacted,
        Self::Responded,
        Self::Interested,
        Self::Applied,
        Self::Onboarded,
        Self::Cancelled,
        Self::Suspended,
    ];

    /// Lowercase storage form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Contacted => "contacted",
            Self::Responded => "responded",
            Self::Interested => "interested",
            Self::Applied => "applied",
            Self::Onboarded => "onboarded",
            Self::Cancelled => "cancelled",
            Self::Suspended => "suspended",
        }
    }

    /// Parse a stored status string.
    ///
    /// # Errors
    /// Returns `HealerError::Validation` for unknown status names.
    pub fn parse(s: &str) -> Result<Self, HealerError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| HealerError::Validation(format!("unknown healer status '{s}'")))
    }
}

impl fmt::Display for HealerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery status of an outreach campaign record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Handed to the mail transport
    #[default]
    Sent,
    /// Accepted by the recipient server
    Delivered,
    /// Opened by the recipient
    Opened,
    /// A link was clicked
    Clicked,
    /// The recipient replied
    Replied,
    /// Bounced back
    Bounced,
}

impl DeliveryStatus {
    /// Lowercase storage form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Opened => "opened",
            Self::Clicked => "clicked",
            Self::Replied => "replied",
            Self::Bounced => "bounced",
        }
    }

    /// Parse a stored delivery status string.
    ///
    /// # Errors
    /// Returns `HealerError::Validation` for unknown values.
    pub fn parse(s: &str) -> Result<Self, HealerError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "opened" => Ok(Self::Opened),
            "clicked" => Ok(Self::Clicked),
            "replied" => Ok(Self::Replied),
            "bounced" => Ok(Self::Bounced),
            other => Err(HealerError::Validation(format!(
                "unknown delivery status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scale a producer used when it computed a confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceScale {
    /// 0.0 to 1.0
    Unit,
    /// 0 to 100
    Percent,
}

/// Contact confidence, always stored on the 0.0..=1.0 scale.
///
/// Values are clamped on construction. Producers that work in percentages
/// convert through [`Confidence::from_scale`].
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Lowest confidence.
    pub const ZERO: Self = Self(0.0);

    /// Default confidence for a record nobody has scored yet.
    pub const UNSCORED: Self = Self(0.5);

    /// Create a confidence from a unit-scale value, clamping into range.
    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Create a confidence from a value on an explicit scale.
    #[must_use]
    pub fn from_scale(value: f64, scale: ConfidenceScale) -> Self {
        match scale {
            ConfidenceScale::Unit => Self::new(value),
            ConfidenceScale::Percent => Self::new(value / 100.0),
        }
    }

    /// The unit-scale value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Rounded percentage (0 to 100).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    /// The larger of two confidences.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A discovered healer business or practitioner.
///
/// The same record shape is used before and after enrichment and
/// persistence; `id` is `None` until the store assigns one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealerCandidate {
    /// Store-assigned identifier
    pub id: Option<String>,
    /// Display name of the practitioner or business
    pub name: String,
    /// Primary email, the natural dedup key when present
    pub email: Option<String>,
    /// Primary phone in `+<digits>` form
    pub phone: Option<String>,
    /// Lower-priority emails found alongside the primary
    pub additional_emails: Vec<String>,
    /// Lower-priority phones found alongside the primary
    pub additional_phones: Vec<String>,
    /// Business website
    pub website: Option<String>,
    /// Social profile URL
    pub instagram: Option<String>,
    /// Free-text "City, ST"
    pub location: Option<String>,
    /// Ordered specialty tags
    pub specialties: Vec<String>,
    /// Biography or listing description
    pub bio: Option<String>,
    /// Years in practice
    pub years_experience: Option<u32>,
    /// Certifications and credentials
    pub certifications: Vec<String>,
    /// Profile image
    pub profile_image_url: Option<String>,
    /// Social follower count
    pub follower_count: Option<u64>,
    /// Social engagement rate
    pub engagement_rate: Option<f64>,
    /// Tag of the discovery source that produced the record
    pub source_platform: String,
    /// Confidence that the contact details reach the practitioner
    pub contact_confidence: Confidence,
    /// Lifecycle status
    pub status: HealerStatus,
    /// When the record was first discovered
    pub discovered_at: DateTime<Utc>,
    /// When outreach last went out
    pub last_contacted: Option<DateTime<Utc>>,
    /// Whether a response came back
    pub response_received: bool,
    /// Free-text notes, appended to over time
    pub notes: Option<String>,
}

impl HealerCandidate {
    /// Create a fresh candidate discovered now by `source_platform`.
    #[must_use]
    pub fn new(name: impl Into<String>, source_platform: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_platform: source_platform.into(),
            contact_confidence: Confidence::UNSCORED,
            discovered_at: Utc::now(),
            ..Self::default()
        }
    }

    /// Whether a non-empty email is present.
    #[must_use]
    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    /// Whether a non-empty phone is present.
    #[must_use]
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    /// Whether a non-empty website is present.
    #[must_use]
    pub fn has_website(&self) -> bool {
        self.website.as_deref().is_some_and(|w| !w.trim().is_empty())
    }

    /// Append a sentence to the notes.
    pub fn append_note(&mut self, note: &str) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {note}", existing.trim_end())
            }
            _ => note.to_string(),
        });
    }

    /// First word of the name, used for greetings.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.name.split_whitespace().next()
    }
}

/// Selection criteria for reading healers back from a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealerFilter {
    /// Only this status
    pub status: Option<HealerStatus>,
    /// Only this source platform
    pub source_platform: Option<String>,
    /// Confidence floor (inclusive)
    pub min_confidence: Option<Confidence>,
    /// Maximum number of records
    pub limit: Option<u32>,
}

impl HealerFilter {
    /// Filter on status.
    #[must_use]
    pub fn with_status(mut self, status: HealerStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter on source platform.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.source_platform = Some(platform.into());
        self
    }

    /// Filter on a confidence floor.
    #[must_use]
    pub fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(Confidence::new(min));
        self
    }

    /// Cap the number of records.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record satisfies every criterion except `limit`.
    #[must_use]
    pub fn matches(&self, healer: &HealerCandidate) -> bool {
        self.status.map_or(true, |s| healer.status == s)
            && self
                .source_platform
                .as_deref()
                .map_or(true, |p| healer.source_platform == p)
            && self
                .min_confidence
                .map_or(true, |min| healer.contact_confidence >= min)
    }
}

/// A stored outreach send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Unique identifier
    pub id: String,
    /// Healer the campaign went to
    pub healer_id: String,
    /// Template identifier
    pub campaign_type: String,
    /// When it was sent
    pub sent_at: DateTime<Utc>,
    /// Rendered subject line
    pub subject: String,
    /// Template file used
    pub template_used: String,
    /// Provider message identifier
    pub message_id: Option<String>,
    /// Delivery status
    pub delivery_status: DeliveryStatus,
    /// Whether a response arrived
    pub response_received: bool,
    /// Response text, if captured
    pub response_text: Option<String>,
    /// When the response arrived
    pub response_date: Option<DateTime<Utc>>,
}

/// Parameters for logging a campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    /// Healer the campaign went to
    pub healer_id: String,
    /// Template identifier
    pub campaign_type: String,
    /// Rendered subject line
    pub subject: String,
    /// Template file used
    pub template_used: String,
    /// Provider message identifier
    pub message_id: Option<String>,
    /// Initial delivery status
    pub delivery_status: DeliveryStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_storage_form() {
        for status in HealerStatus::ALL {
            assert_eq!(HealerStatus::parse(status.as_str()).expect("parse"), status);
        }
        assert_eq!(
            HealerStatus::parse(" Contacted ").expect("parse"),
            HealerStatus::Contacted
        );
        assert!(HealerStatus::parse("ghosted").is_err());
    }

    #[test]
    fn test_confidence_clamps_and_converts() {
        assert!((Confidence::new(1.7).value() - 1.0).abs() < f64::EPSILON);
        assert!((Confidence::new(-0.3).value()).abs() < f64::EPSILON);
        assert_eq!(Confidence::new(f64::NAN), Confidence::ZERO);

        let pct = Confidence::from_scale(85.0, ConfidenceScale::Percent);
        assert!((pct.value() - 0.85).abs() < 1e-9);
        assert_eq!(pct.percent(), 85);
    }

    #[test]
    fn test_confidence_max_never_lowers() {
        let high = Confidence::new(0.9);
        let low = Confidence::new(0.7);
        assert_eq!(high.max(low), high);
        assert_eq!(low.max(high), high);
    }

    #[test]
    fn test_append_note() {
        let mut healer = HealerCandidate::new("Luna Rivers", "psychology_today");
        healer.append_note("First.");
        healer.append_note("  ");
        healer.append_note("Second.");
        assert_eq!(healer.notes.as_deref(), Some("First. Second."));
        assert_eq!(healer.first_name(), Some("Luna"));
    }

    #[test]
    fn test_filter_matches() {
        let mut healer = HealerCandidate::new("Sage", "instagram");
        healer.contact_confidence = Confidence::new(0.65);

        assert!(HealerFilter::default().matches(&healer));
        assert!(HealerFilter::default()
            .with_status(HealerStatus::Discovered)
            .with_min_confidence(0.6)
            .matches(&healer));
        assert!(!HealerFilter::default().with_min_confidence(0.7).matches(&healer));
        assert!(!HealerFilter::default()
            .with_platform("linkedin")
            .matches(&healer));
    }
}
