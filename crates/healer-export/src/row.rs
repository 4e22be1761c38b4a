//! Mail-merge row mapping and the derived scoring columns.

use healer_core::taxonomy::has_high_value_specialty;
use healer_core::HealerCandidate;
use serde::Serialize;
use std::fmt;

/// Column names, in output order. Mail-merge templates bind to these.
pub const COLUMNS: [&str; 20] = [
    "Full_Name",
    "Email",
    "Phone",
    "Location",
    "Website",
    "Instagram",
    "Specialties",
    "Bio",
    "Years_Experience",
    "Certifications",
    "Followers",
    "Contact_Quality",
    "Source",
    "Discovery_Date",
    "Status",
    "Notes",
    "Outreach_Priority",
    "Best_Contact_Method",
    "Platform_Profile_URL",
    "Outreach_Template",
];

const BIO_MAX_CHARS: usize = 200;

/// Outreach priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Priority {
    /// Score of 7 or more
    High,
    /// Score of 4 to 6
    Medium,
    /// Everything else
    Low,
}

impl Priority {
    /// Tier for a point score.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            7.. => Self::High,
            4..=6 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Column value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a healer is best reached, most preferred first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ContactMethod {
    /// Email and phone both on file
    EmailAndPhone,
    /// Email only
    Email,
    /// Phone only
    Phone,
    /// Social profile only
    InstagramDm,
    /// Website only
    WebsiteContactForm,
    /// Nothing usable
    ResearchRequired,
}

impl ContactMethod {
    /// Every method, in preference order.
    pub const ALL: [Self; 6] = [
        Self::EmailAndPhone,
        Self::Email,
        Self::Phone,
        Self::InstagramDm,
        Self::WebsiteContactForm,
        Self::ResearchRequired,
    ];

    /// Best method for the fields `healer` has.
    #[must_use]
    pub fn for_healer(healer: &HealerCandidate) -> Self {
        let has_instagram = healer.instagram.as_deref().is_some_and(|s| !s.is_empty());
        match (healer.has_email(), healer.has_phone()) {
            (true, true) => Self::EmailAndPhone,
            (true, false) => Self::Email,
            (false, true) => Self::Phone,
            (false, false) if has_instagram => Self::InstagramDm,
            (false, false) if healer.has_website() => Self::WebsiteContactForm,
            (false, false) => Self::ResearchRequired,
        }
    }

    /// Column value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailAndPhone => "Email + Phone",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::InstagramDm => "Instagram DM",
            Self::WebsiteContactForm => "Website Contact Form",
            Self::ResearchRequired => "Research Required",
        }
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point score behind [`Priority`]. Deterministic in the healer's fields.
#[must_use]
pub fn priority_score(healer: &HealerCandidate) -> u32 {
    let mut score = 0;
    if healer.has_email() {
        score += 3;
    }
    if healer.has_website() {
        score += 2;
    }
    if healer.contact_confidence.value() >= 0.7 {
        score += 2;
    }
    if has_high_value_specialty(&healer.specialties) {
        score += 2;
    }
    if healer
        .follower_count
        .is_some_and(|f| (500..=10_000).contains(&f))
    {
        score += 1;
    }
    if healer.years_experience.is_some_and(|y| y >= 2) {
        score += 1;
    }
    score
}

/// Suggested mail-merge template, by the first matching specialty tag.
#[must_use]
pub fn suggested_template(healer: &HealerCandidate) -> &'static str {
    const BY_SPECIALTY: [(&str, &str); 4] = [
        ("Reiki", "Reiki_Master_Template"),
        ("Crystal Healing", "Crystal_Healer_Template"),
        ("Spiritual Coaching", "Spiritual_Coach_Template"),
        ("Energy Healing", "Energy_Healer_Template"),
    ];
    BY_SPECIALTY
        .iter()
        .find(|(tag, _)| {
            healer
                .specialties
                .iter()
                .any(|s| s.eq_ignore_ascii_case(tag))
        })
        .map_or("General_Healer_Template", |(_, template)| *template)
}

/// `(XXX) XXX-XXXX` for ten-digit US numbers, the input unchanged otherwise.
#[must_use]
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone
        .strip_prefix("+1")
        .unwrap_or(phone)
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if digits.len() == 10 {
        format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        phone.to_string()
    }
}

/// `1.2K`, `3.4M`, or the plain number below a thousand.
#[must_use]
pub fn format_followers(count: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let n = count as f64;
    if count >= 1_000_000 {
        format!("{:.1}M", n / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", n / 1_000.0)
    } else {
        count.to_string()
    }
}

fn truncate_bio(bio: &str) -> String {
    if bio.chars().count() <= BIO_MAX_CHARS {
        return bio.to_string();
    }
    let kept: String = bio.chars().take(BIO_MAX_CHARS - 3).collect();
    format!("{kept}...")
}

/// One healer flattened for mail-merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    /// `Full_Name`
    pub full_name: String,
    /// `Email`
    pub email: String,
    /// `Phone`
    pub phone: String,
    /// `Location`
    pub location: String,
    /// `Website`
    pub website: String,
    /// `Instagram`
    pub instagram: String,
    /// `Specialties`, comma separated
    pub specialties: String,
    /// `Bio`, at most 200 characters
    pub bio: String,
    /// `Years_Experience`
    pub years_experience: String,
    /// `Certifications`, comma separated
    pub certifications: String,
    /// `Followers`
    pub followers: String,
    /// `Contact_Quality`, `NN%`
    pub contact_quality: String,
    /// `Source`
    pub source: String,
    /// `Discovery_Date`, MM/DD/YYYY
    pub discovery_date: String,
    /// `Status`
    pub status: String,
    /// `Notes`
    pub notes: String,
    /// `Outreach_Priority`
    pub priority: Priority,
    /// `Best_Contact_Method`
    pub best_contact_method: ContactMethod,
    /// `Platform_Profile_URL`
    pub profile_url: String,
    /// `Outreach_Template`
    pub template: String,
}

impl ExportRow {
    /// Map one healer to its export row.
    #[must_use]
    pub fn from_healer(healer: &HealerCandidate) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let profile_url = healer
            .instagram
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| healer.website.clone())
            .unwrap_or_default();

        Self {
            full_name: healer.name.clone(),
            email: text(&healer.email),
            phone: healer.phone.as_deref().map(format_phone).unwrap_or_default(),
            location: text(&healer.location),
            website: text(&healer.website),
            instagram: text(&healer.instagram),
            specialties: healer.specialties.join(", "),
            bio: healer.bio.as_deref().map(truncate_bio).unwrap_or_default(),
            years_experience: healer
                .years_experience
                .map(|y| y.to_string())
                .unwrap_or_default(),
            certifications: healer.certifications.join(", "),
            followers: healer.follower_count.map(format_followers).unwrap_or_default(),
            contact_quality: format!("{}%", healer.contact_confidence.percent()),
            source: healer.source_platform.clone(),
            discovery_date: healer.discovered_at.format("%m/%d/%Y").to_string(),
            status: healer.status.as_str().to_string(),
            notes: text(&healer.notes),
            priority: Priority::from_score(priority_score(healer)),
            best_contact_method: ContactMethod::for_healer(healer),
            profile_url,
            template: suggested_template(healer).to_string(),
        }
    }

    /// Cell values in [`COLUMNS`] order.
    #[must_use]
    pub fn values(&self) -> [&str; 20] {
        [
            self.full_name.as_str(),
            self.email.as_str(),
            self.phone.as_str(),
            self.location.as_str(),
            self.website.as_str(),
            self.instagram.as_str(),
            self.specialties.as_str(),
            self.bio.as_str(),
            self.years_experience.as_str(),
            self.certifications.as_str(),
            self.followers.as_str(),
            self.contact_quality.as_str(),
            self.source.as_str(),
            self.discovery_date.as_str(),
            self.status.as_str(),
            self.notes.as_str(),
            self.priority.as_str(),
            self.best_contact_method.as_str(),
            self.profile_url.as_str(),
            self.template.as_str(),
        ]
    }
}
