//! Email discovery and scoring.
//!
//! Finds addresses in free text and HTML (including `name(at)domain(dot)com`
//! style obfuscation), validates them against a strict grammar and a TLD
//! allow-list, and scores how likely each is to reach a real person.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum emails kept per source.
pub const MAX_EMAILS: usize = 5;

static AT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:\(at\)|\[at\]|\bat\b)\s*").expect("At-token regex is hardcoded and valid")
});

static DOT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:\(dot\)|\[dot\]|\bdot\b)\s*")
        .expect("Dot-token regex is hardcoded and valid")
});

/// Address with optional whitespace around the `@`.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+\s*@\s*[a-z0-9.-]+\.[a-z]{2,}\b")
        .expect("Email regex is hardcoded and valid")
});

static STRICT_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_%+-]+(?:\.[a-z0-9_%+-]+)*@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}$")
        .expect("Strict email regex is hardcoded and valid")
});

static LONG_DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4,}").expect("Digit-run regex is hardcoded and valid"));

const BLACKLISTED_LOCAL_PARTS: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "admin",
    "webmaster",
    "postmaster",
    "mailer-daemon",
];

const PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "test.com",
    "sample.com",
    "demo.com",
    "yourdomain.com",
    "yoursite.com",
    "placeholder.com",
];

const ALLOWED_TLDS: &[&str] = &[
    "com", "org", "net", "edu", "gov", "co", "io", "me", "us", "ca", "uk", "au", "de", "fr",
    "info", "biz", "life", "health",
];

const FREE_PROVIDERS: &[&str] = &["gmail.com", "yahoo.com", "hotmail.com", "outlook.com"];

const PERSONAL_PROVIDERS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "icloud.com",
];

const BUSINESS_PREFIXES: &[&str] = &["info", "contact", "hello", "inquiries", "booking"];

/// Who an address most likely belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    /// Shared business inbox (`info@`, `hello@`, ...)
    Business,
    /// Free webmail account
    Personal,
    /// Address on the practitioner's own domain
    Professional,
}

/// A validated address with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEmail {
    /// Normalized address
    pub email: String,
    /// Score in `0.1..=1.0`
    pub confidence: f64,
    /// Classification
    pub kind: EmailKind,
}

impl ScoredEmail {
    /// Score and classify a normalized address.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            confidence: email_confidence(&email),
            kind: classify_email(&email),
            email,
        }
    }
}

/// Rewrite `(at)`, `[at]` and a standalone `at` to `@`, and the same forms
/// of `dot` to `.`, removing the spaces around them.
pub fn deobfuscate(text: &str) -> String {
    let text = AT_TOKEN.replace_all(text, "@");
    DOT_TOKEN.replace_all(&text, ".").into_owned()
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn split(email: &str) -> Option<(&str, &str)> {
    email.split_once('@')
}

/// Every address-shaped string in `text`, normalized and de-duplicated,
/// before any filtering.
///
/// Plain addresses are taken from the raw text first. De-obfuscation turns
/// a standalone `at` into `@`, which mangles "write me at a.b@c.com", so it
/// only runs over what is left once those addresses are blanked out.
pub fn email_candidates(text: &str) -> Vec<String> {
    let rest = EMAIL_PATTERN.replace_all(text, " ");
    let clean = deobfuscate(&rest);
    let mut seen = HashSet::new();

    EMAIL_PATTERN
        .find_iter(text)
        .chain(EMAIL_PATTERN.find_iter(&clean))
        .map(|m| normalize(m.as_str()))
        .filter(|email| seen.insert(email.clone()))
        .collect()
}

fn is_blacklisted(local: &str) -> bool {
    BLACKLISTED_LOCAL_PARTS.contains(&local)
}

fn is_placeholder(domain: &str) -> bool {
    PLACEHOLDER_DOMAINS.contains(&domain)
}

/// Strict grammar plus TLD allow-list. Expects a normalized address.
pub fn is_valid_email(email: &str) -> bool {
    if !STRICT_EMAIL.is_match(email) {
        return false;
    }
    split(email)
        .and_then(|(_, domain)| domain.rsplit('.').next())
        .is_some_and(|tld| ALLOWED_TLDS.contains(&tld))
}

/// Whether an address is fit to contact: valid, not a role mailbox we
/// never write to, not a placeholder.
pub fn is_contactable(email: &str) -> bool {
    is_valid_email(email)
        && split(email).is_some_and(|(local, domain)| !is_blacklisted(local) && !is_placeholder(domain))
}

/// Score an address in `0.1..=1.0`.
pub fn email_confidence(email: &str) -> f64 {
    let Some((local, domain)) = split(email) else {
        return 0.1;
    };

    let mut confidence: f64 = 0.5;
    if [".com", ".org", ".net"].iter().any(|tld| domain.ends_with(tld)) {
        confidence += 0.2;
    }
    if FREE_PROVIDERS.contains(&domain) {
        confidence += 0.1;
    }
    if local.contains('.') || local.contains('_') {
        confidence += 0.1;
    }
    if LONG_DIGIT_RUN.is_match(local) {
        confidence -= 0.2;
    }

    confidence.clamp(0.1, 1.0)
}

/// Classify an address.
pub fn classify_email(email: &str) -> EmailKind {
    let (local, domain) = split(email).unwrap_or((email, ""));
    let local = local.to_lowercase();

    if BUSINESS_PREFIXES.iter().any(|p| local.starts_with(p)) {
        EmailKind::Business
    } else if PERSONAL_PROVIDERS.contains(&domain) {
        EmailKind::Personal
    } else {
        EmailKind::Professional
    }
}

/// Rank `emails` by confidence (ties keep input order) and keep the top
/// [`MAX_EMAILS`].
pub fn rank(mut emails: Vec<ScoredEmail>) -> Vec<ScoredEmail> {
    let mut seen = HashSet::new();
    emails.retain(|e| seen.insert(e.email.clone()));
    emails.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    emails.truncate(MAX_EMAILS);
    emails
}

/// Contactable addresses in `text`, best first, at most [`MAX_EMAILS`].
pub fn extract_emails(text: &str) -> Vec<ScoredEmail> {
    let scored = email_candidates(text)
        .into_iter()
        .filter(|email| is_contactable(email))
        .map(ScoredEmail::new)
        .collect();
    rank(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emails(text: &str) -> Vec<String> {
        extract_emails(text).into_iter().map(|e| e.email).collect()
    }

    #[test]
    fn test_deobfuscate_variants() {
        assert_eq!(deobfuscate("user(at)example(dot)com"), "user@example.com");
        assert_eq!(deobfuscate("luna [at] reiki [dot] org"), "luna@reiki.org");
        assert_eq!(deobfuscate("luna AT reiki DOT org"), "luna@reiki.org");
        assert_eq!(deobfuscate("no tokens here"), "no tokens here");
    }

    #[test]
    fn test_obfuscated_placeholder_is_recovered_but_not_emitted() {
        let text = "Write to user(at)example(dot)com";
        assert_eq!(email_candidates(text), vec!["user@example.com"]);
        assert!(extract_emails(text).is_empty());
    }

    #[test]
    fn test_obfuscated_real_address_is_extracted() {
        assert_eq!(
            emails("Email me: sage.moon(at)moonreiki(dot)com"),
            vec!["sage.moon@moonreiki.com"]
        );
    }

    #[test]
    fn test_plain_address_after_the_word_at() {
        assert_eq!(
            emails("Email me at luna.rivers@lunahealing.com"),
            vec!["luna.rivers@lunahealing.com"]
        );
        assert_eq!(
            emails("Book at first.last@stillwaterreiki.org or call"),
            vec!["first.last@stillwaterreiki.org"]
        );
        assert_eq!(
            email_candidates("Reach me at luna.co@lunahealing.com or sage(at)moonreiki(dot)com"),
            vec!["luna.co@lunahealing.com", "sage@moonreiki.com"]
        );
    }

    #[test]
    fn test_spaced_address_is_normalized() {
        assert_eq!(emails("Luna @ LunaHealing.com"), vec!["luna@lunahealing.com"]);
    }

    #[test]
    fn test_blacklisted_and_placeholder_filtered() {
        let text = "noreply@studio.com admin@studio.com jane@yourdomain.com \
                    mailer-daemon@studio.com jane@studio.com";
        assert_eq!(emails(text), vec!["jane@studio.com"]);
    }

    #[test]
    fn test_tld_allow_list() {
        assert!(is_valid_email("jane@studio.health"));
        assert!(is_valid_email("jane@studio.co.uk"));
        assert!(!is_valid_email("jane@studio.xyz"));
        assert!(!is_valid_email("jane..doe@studio.com"));
        assert!(!is_valid_email("jane@-studio.com"));
        assert!(!is_valid_email("not-an-email"));
    }

    #[test]
    fn test_confidence_rules() {
        assert!((email_confidence("info@healingcenter.com") - 0.7).abs() < 1e-9);
        assert!((email_confidence("luna.rivers@gmail.com") - 0.9).abs() < 1e-9);
        assert!((email_confidence("healer2024@reiki.io") - 0.3).abs() < 1e-9);
        assert!((email_confidence("a@b.io") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify_email("info@healingcenter.com"), EmailKind::Business);
        assert_eq!(classify_email("luna@icloud.com"), EmailKind::Personal);
        assert_eq!(classify_email("luna@lunahealing.com"), EmailKind::Professional);
    }

    #[test]
    fn test_ranked_and_capped() {
        let text = "a1@x.io b2@x.io c3@x.io d4@x.io e5@x.io first.last@gmail.com";
        let found = extract_emails(text);
        assert_eq!(found.len(), MAX_EMAILS);
        assert_eq!(found[0].email, "first.last@gmail.com");
        for pair in found.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_output_is_lowercase_and_valid() {
        for e in extract_emails("Contact HELLO@SacredSpace.ORG or Jane.Doe@Gmail.com") {
            assert_eq!(e.email, e.email.to_lowercase());
            assert!(is_valid_email(&e.email));
        }
    }
}
