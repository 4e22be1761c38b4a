//! Outreach email templates and typed placeholder rendering.

use crate::error::{OutreachError, Result};
use chrono::{DateTime, Utc};
use healer_core::{HealerCandidate, PlatformProfile};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Template used by the daily schedule.
pub const INITIAL_OUTREACH: &str = "initial_outreach";

const INITIAL_HTML: &str = include_str!("../templates/initial_outreach.html");
const FOLLOWUP_1_HTML: &str = include_str!("../templates/followup_1.html");
const FOLLOWUP_2_HTML: &str = include_str!("../templates/followup_2.html");

const PRACTICE_LINE: &str = "I came across your {{specialties}} practice";
const PEER_LINE: &str = "someone with your expertise";

/// Specialty templates: the initial invitation with its opening and
/// closing lines swapped.
const SPECIALTY_VARIANTS: &[(&str, &str, &str)] = &[
    (
        "reiki_master",
        "I came across your Reiki practice and was moved by your dedication to channeling life force energy",
        "a gifted Reiki Master like yourself",
    ),
    (
        "crystal_healer",
        "I discovered your crystal healing practice and was fascinated by your understanding of crystal energies",
        "a knowledgeable crystal healer like yourself",
    ),
    (
        "spiritual_coach",
        "I found your spiritual coaching work and was inspired by your commitment to guiding others",
        "an experienced spiritual guide like yourself",
    ),
    (
        "energy_healer",
        "I discovered your energy healing practice and was impressed by your intuitive approach",
        "a skilled energy healer like yourself",
    ),
];

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([^{}\s]*)\s*\}\}").expect("Placeholder regex is hardcoded and valid")
});
static HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<head[^>]*>.*?</head>").expect("Head regex is hardcoded and valid")
});
static STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:style|script)[^>]*>.*?</(?:style|script)>")
        .expect("Style regex is hardcoded and valid")
});
static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("Tag regex is hardcoded and valid"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Whitespace regex is hardcoded and valid"));

/// The tokens a template may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Placeholder {
    /// Full name, or "Fellow Healer"
    HealerName,
    /// First word of the name, or "there"
    FirstName,
    /// Specialties joined with commas, or "healing work"
    Specialties,
    /// Location, or "your area"
    Location,
    /// Where the healer was found ("on Instagram")
    Platform,
    /// Our platform's name
    PlatformName,
    /// Our platform's home page
    PlatformUrl,
    /// Registration link
    SignupUrl,
    /// Reply-to address
    ContactEmail,
    /// Month and year of sending
    CurrentDate,
    /// Per-recipient unsubscribe link
    UnsubscribeUrl,
}

impl Placeholder {
    /// Every placeholder.
    pub const ALL: [Self; 11] = [
        Self::HealerName,
        Self::FirstName,
        Self::Specialties,
        Self::Location,
        Self::Platform,
        Self::PlatformName,
        Self::PlatformUrl,
        Self::SignupUrl,
        Self::ContactEmail,
        Self::CurrentDate,
        Self::UnsubscribeUrl,
    ];

    /// Token text between the braces.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::HealerName => "healerName",
            Self::FirstName => "firstName",
            Self::Specialties => "specialties",
            Self::Location => "location",
            Self::Platform => "platform",
            Self::PlatformName => "platformName",
            Self::PlatformUrl => "platformUrl",
            Self::SignupUrl => "signupUrl",
            Self::ContactEmail => "contactEmail",
            Self::CurrentDate => "currentDate",
            Self::UnsubscribeUrl => "unsubscribeUrl",
        }
    }

    /// Look up a token. Matching is exact.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

/// Values for every placeholder, resolved for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFields {
    values: BTreeMap<Placeholder, String>,
}

impl MergeFields {
    /// Resolve the fields for `healer`, falling back to friendly defaults.
    #[must_use]
    pub fn for_healer(
        healer: &HealerCandidate,
        platform: &PlatformProfile,
        now: DateTime<Utc>,
    ) -> Self {
        let name = healer.name.trim();
        let specialties = if healer.specialties.is_empty() {
            "healing work".to_string()
        } else {
            healer.specialties.join(", ")
        };
        let unsubscribe = format!(
            "{}/unsubscribe?email={}",
            platform.url.trim_end_matches('/'),
            urlencoding::encode(healer.email.as_deref().unwrap_or_default())
        );

        let values = [
            (
                Placeholder::HealerName,
                if name.is_empty() { "Fellow Healer" } else { name }.to_string(),
            ),
            (
                Placeholder::FirstName,
                healer.first_name().unwrap_or("there").to_string(),
            ),
            (Placeholder::Specialties, specialties),
            (
                Placeholder::Location,
                healer
                    .location
                    .clone()
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| "your area".to_string()),
            ),
            (
                Placeholder::Platform,
                found_on(&healer.source_platform).to_string(),
            ),
            (Placeholder::PlatformName, platform.name.clone()),
            (Placeholder::PlatformUrl, platform.url.clone()),
            (Placeholder::SignupUrl, platform.signup_url.clone()),
            (Placeholder::ContactEmail, platform.contact_email.clone()),
            (Placeholder::CurrentDate, now.format("%B %Y").to_string()),
            (Placeholder::UnsubscribeUrl, unsubscribe),
        ];

        Self {
            values: values.into_iter().collect(),
        }
    }

    /// The value for one placeholder.
    #[must_use]
    pub fn get(&self, placeholder: Placeholder) -> &str {
        self.values.get(&placeholder).map_or("", String::as_str)
    }
}

fn found_on(source_platform: &str) -> &'static str {
    match source_platform {
        "instagram" => "on Instagram",
        "psychology_today" => "on Psychology Today",
        "linkedin" => "on LinkedIn",
        "google_my_business" => "on Google",
        "wellness_directories" => "in a wellness directory",
        _ => "online",
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Substitute every `{{token}}` in `source`.
///
/// # Errors
/// Returns [`OutreachError::UnknownPlaceholder`] for any token that is not a
/// [`Placeholder`]; nothing is partially rendered.
pub fn render(template_name: &str, source: &str, fields: &MergeFields) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for caps in TOKEN.captures_iter(source) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let token = caps.get(1).map_or("", |m| m.as_str());
        let placeholder =
            Placeholder::from_token(token).ok_or_else(|| OutreachError::UnknownPlaceholder {
                template: template_name.to_string(),
                token: token.to_string(),
            })?;

        out.push_str(&source[last..whole.start]);
        out.push_str(&escape_html(fields.get(placeholder)));
        last = whole.end;
    }
    out.push_str(&source[last..]);
    Ok(out)
}

/// Plain-text version of an HTML body.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let without_head = HEAD.replace_all(html, " ");
    let without_styles = STYLE.replace_all(&without_head, " ");
    let stripped = TAG.replace_all(&without_styles, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Subject lines for a template. Templates without their own set use the
/// initial invitation's.
#[must_use]
pub fn subject_variants(template: &str, fields: &MergeFields) -> Vec<String> {
    let first = fields.get(Placeholder::FirstName);
    let ours = fields.get(Placeholder::PlatformName);
    match template {
        "followup_1" => vec![
            format!("Following up on {ours}, {first}"),
            format!("{first}, quick question about your healing practice"),
            format!("{ours} - still interested, {first}?"),
        ],
        "followup_2" => vec![
            format!("Last invitation to join {ours}, {first}"),
            format!("Final opportunity - {ours}"),
            format!("{first}, we'd love to have you on {ours}"),
        ],
        _ => vec![
            format!("{first}, join {ours}'s spiritual healing community"),
            format!("Invitation for {first} - {ours} healing platform"),
            format!("{first}, connect with seekers on {ours}"),
            format!(
                "{ours} invitation for {} practitioners",
                fields.get(Placeholder::Specialties)
            ),
        ],
    }
}

/// Named HTML templates: the built-in set plus any overrides.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, String>,
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateLibrary {
    /// The seven compiled-in templates.
    #[must_use]
    pub fn builtin() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(INITIAL_OUTREACH.to_string(), INITIAL_HTML.to_string());
        templates.insert("followup_1".to_string(), FOLLOWUP_1_HTML.to_string());
        templates.insert("followup_2".to_string(), FOLLOWUP_2_HTML.to_string());
        for (name, practice, peer) in SPECIALTY_VARIANTS {
            let html = INITIAL_HTML
                .replace(PRACTICE_LINE, practice)
                .replace(PEER_LINE, peer);
            templates.insert((*name).to_string(), html);
        }
        Self { templates }
    }

    /// Built-ins overlaid with every `*.html` file in `dir`, keyed by file
    /// stem. A missing directory leaves the built-ins alone.
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let mut library = Self::builtin();
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "templates directory not found, using built-in templates");
            return Ok(library);
        }

        let mut loaded = 0usize;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let html = std::fs::read_to_string(&path).map_err(|e| {
                OutreachError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            library.templates.insert(name.to_string(), html);
            loaded += 1;
        }

        info!(dir = %dir.display(), count = loaded, "loaded template overrides");
        Ok(library)
    }

    /// Write every template to `dir` as `<name>.html`, for editing.
    pub fn write_to(&self, dir: &Path) -> Result<usize> {
        std::fs::create_dir_all(dir)?;
        for (name, html) in &self.templates {
            std::fs::write(dir.join(format!("{name}.html")), html)?;
        }
        Ok(self.templates.len())
    }

    /// Template HTML by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Template names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}
