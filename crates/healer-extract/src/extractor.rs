//! Contact enrichment for discovered healers.

use crate::email::{email_confidence, extract_emails, rank, ScoredEmail};
use crate::error::{ExtractError, Result};
use crate::links::find_contact_link;
use crate::phone::{extract_phones, MAX_PHONES};
use healer_core::{Confidence, HealerCandidate, PageFetcher};
use healer_ratelimit::{pause, RateLimiter};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const ENRICHMENT_PLATFORM: &str = "enrichment";
const ENRICHMENT_ACTION: &str = "contact_extraction";

/// Confidence floor once a website yields an email.
const WEBSITE_EMAIL_CONFIDENCE: f64 = 0.8;
/// Confidence floor once a bio yields an email.
const BIO_EMAIL_CONFIDENCE: f64 = 0.7;

/// Emails and phones found on one or more pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactInfo {
    /// Ranked emails, best first
    pub emails: Vec<ScoredEmail>,
    /// Normalized phones, first seen first
    pub phones: Vec<String>,
}

impl ContactInfo {
    /// Extract everything from one page or text blob.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            emails: extract_emails(text),
            phones: extract_phones(text),
        }
    }

    /// Whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty()
    }

    /// Combine two results, re-ranking emails and keeping caps.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.emails.extend(other.emails);
        self.emails = rank(self.emails);
        for phone in other.phones {
            if !self.phones.contains(&phone) {
                self.phones.push(phone);
            }
        }
        self.phones.truncate(MAX_PHONES);
        self
    }
}

/// Finds contact details on healers' websites and in their bios.
pub struct ContactExtractor {
    fetcher: Arc<dyn PageFetcher>,
    limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for ContactExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactExtractor").finish_non_exhaustive()
    }
}

impl ContactExtractor {
    /// Create an extractor fetching pages through `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, limiter: Arc<RateLimiter>) -> Self {
        Self { fetcher, limiter }
    }

    /// Contacts from a website's page plus the first contact page it links.
    pub async fn extract_from_website(&self, url: &str) -> Result<ContactInfo> {
        let base = Url::parse(url).map_err(|source| ExtractError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        info!(url = %url, "extracting contacts from website");
        let html = self.fetcher.fetch(url).await?;

        let page = ContactInfo::from_text(&html);
        let contact_page = self.check_contact_page(&html, &base).await;
        let merged = page.merge(contact_page);

        info!(
            url = %url,
            emails = merged.emails.len(),
            phones = merged.phones.len(),
            "contact extraction complete"
        );
        Ok(merged)
    }

    /// Contacts from the page's contact link, if it has one.
    ///
    /// Never fails: a missing link or a failed fetch gives an empty result.
    pub async fn check_contact_page(&self, html: &str, base: &Url) -> ContactInfo {
        let Some(contact_url) = find_contact_link(html, base) else {
            return ContactInfo::default();
        };

        match self.fetcher.fetch(contact_url.as_str()).await {
            Ok(page) => {
                let info = ContactInfo::from_text(&page);
                debug!(
                    contact_url = %contact_url,
                    emails = info.emails.len(),
                    phones = info.phones.len(),
                    "found contact page"
                );
                info
            }
            Err(e) => {
                debug!(contact_url = %contact_url, error = %e, "could not fetch contact page");
                ContactInfo::default()
            }
        }
    }

    /// Fill in missing contact details. Any failure returns the input
    /// unchanged; confidence never decreases.
    pub async fn enrich_healer_contacts(&self, healer: &HealerCandidate) -> HealerCandidate {
        match self.try_enrich(healer).await {
            Ok(enriched) => {
                info!(
                    healer = %enriched.name,
                    has_email = enriched.has_email(),
                    has_phone = enriched.has_phone(),
                    confidence = %enriched.contact_confidence,
                    "contact enrichment complete"
                );
                enriched
            }
            Err(e) => {
                warn!(healer = %healer.name, error = %e, "contact enrichment failed");
                healer.clone()
            }
        }
    }

    async fn try_enrich(&self, healer: &HealerCandidate) -> Result<HealerCandidate> {
        let mut enriched = healer.clone();

        if let Some(website) = healer.website.as_deref().filter(|w| !w.trim().is_empty()) {
            let found = self.extract_from_website(website).await?;
            if adopt_emails(&mut enriched, found.emails) {
                raise_confidence(&mut enriched, WEBSITE_EMAIL_CONFIDENCE);
            }
            adopt_phones(&mut enriched, found.phones);
        }

        if let Some(bio) = healer.bio.as_deref() {
            if !enriched.has_email() {
                let emails = extract_emails(bio);
                if let Some(top) = emails.into_iter().next() {
                    enriched.email = Some(top.email);
                    raise_confidence(&mut enriched, BIO_EMAIL_CONFIDENCE);
                }
            }
            if !enriched.has_phone() {
                enriched.phone = extract_phones(bio).into_iter().next();
            }
        }

        let mut channels = Vec::new();
        if enriched.has_email() {
            channels.push("email extracted");
        }
        if enriched.has_phone() {
            channels.push("phone extracted");
        }
        if enriched.has_website() {
            channels.push("website available");
        }
        if !channels.is_empty() {
            let note = format!("Contact info: {}.", channels.join(", "));
            if !enriched.notes.as_deref().is_some_and(|n| n.contains(&note)) {
                enriched.append_note(&note);
            }
        }

        Ok(enriched)
    }

    /// Enrich records one at a time under the `enrichment` quota.
    ///
    /// Once the limiter denies, the remaining records pass through as-is.
    pub async fn batch_enrich(&self, healers: Vec<HealerCandidate>) -> Vec<HealerCandidate> {
        let total = healers.len();
        let mut out = Vec::with_capacity(total);
        let mut pending = healers.into_iter();
        let delays = self.limiter.delays();

        while let Some(healer) = pending.next() {
            let decision = self
                .limiter
                .can_perform_action(ENRICHMENT_PLATFORM, ENRICHMENT_ACTION)
                .await;
            if !decision.allowed {
                warn!(
                    reason = decision.reason.as_deref().unwrap_or_default(),
                    remaining = pending.len() + 1,
                    "enrichment stopped by rate limiter"
                );
                out.push(healer);
                out.extend(pending);
                break;
            }

            out.push(self.enrich_healer_contacts(&healer).await);

            if let Err(e) = self
                .limiter
                .record_action(ENRICHMENT_PLATFORM, ENRICHMENT_ACTION)
                .await
            {
                warn!(error = %e, "failed to record enrichment action");
            }
            pause(delays.random_delay()).await;
        }

        info!(
            processed = out.len(),
            with_contacts = out.iter().filter(|h| h.has_email() || h.has_phone()).count(),
            "batch contact enrichment complete"
        );
        out
    }
}

fn raise_confidence(healer: &mut HealerCandidate, floor: f64) {
    healer.contact_confidence = healer.contact_confidence.max(Confidence::new(floor));
}

/// Merge ranked emails into the record. Returns whether a website email
/// now backs the primary address.
fn adopt_emails(healer: &mut HealerCandidate, emails: Vec<ScoredEmail>) -> bool {
    let Some(top) = emails.first().cloned() else {
        return false;
    };

    let current = healer.email.clone().filter(|e| !e.trim().is_empty());
    let primary = match current {
        Some(existing) if existing == top.email => existing,
        Some(existing) if email_confidence(&existing) >= top.confidence => existing,
        Some(existing) => {
            push_unique(&mut healer.additional_emails, existing);
            top.email.clone()
        }
        None => top.email.clone(),
    };

    for e in emails {
        if e.email != primary {
            push_unique(&mut healer.additional_emails, e.email);
        }
    }
    healer.additional_emails.retain(|e| *e != primary);
    healer.email = Some(primary);
    true
}

fn adopt_phones(healer: &mut HealerCandidate, phones: Vec<String>) {
    let mut phones = phones.into_iter();
    if !healer.has_phone() {
        healer.phone = phones.next();
    }
    for phone in phones {
        if healer.phone.as_deref() != Some(phone.as_str()) {
            push_unique(&mut healer.additional_phones, phone);
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use healer_core::{DelayConfig, MemoryStore, RateLimitConfig, Settings, StaticFetcher};
    use healer_ratelimit::{FixedClock, SeededDelays};

    fn limiter() -> Arc<RateLimiter> {
        let store = Arc::new(MemoryStore::with_default_settings());
        let clock = NaiveDate::from_ymd_opt(2026, 3, 3)
            .and_then(|d| d.and_hms_opt(11, 0, 0))
            .expect("valid datetime");
        Arc::new(
            RateLimiter::new(store.clone(), Settings::new(store), RateLimitConfig::default())
                .with_clock(Arc::new(FixedClock::new(clock)))
                .with_delays(Arc::new(SeededDelays::new(DelayConfig::none()))),
        )
    }

    fn extractor(fetcher: StaticFetcher) -> ContactExtractor {
        ContactExtractor::new(Arc::new(fetcher), limiter())
    }

    fn site() -> StaticFetcher {
        StaticFetcher::new()
            .with_page(
                "https://lunahealing.com",
                r#"<html><body>
                    <h1>Luna Rivers Reiki</h1>
                    <p>Write to luna.rivers@lunahealing.com</p>
                    <a href="/contact">Contact</a>
                </body></html>"#,
            )
            .with_page(
                "https://lunahealing.com/contact",
                "<p>Bookings: info@lunahealing.com or (555) 123-4567</p>",
            )
    }

    fn healer_with_site() -> HealerCandidate {
        let mut h = HealerCandidate::new("Luna Rivers", "psychology_today");
        h.website = Some("https://lunahealing.com".to_string());
        h.contact_confidence = Confidence::new(0.6);
        h
    }

    #[tokio::test]
    async fn test_extract_from_website_merges_contact_page() {
        let info = extractor(site())
            .extract_from_website("https://lunahealing.com")
            .await
            .expect("extract");

        let emails: Vec<_> = info.emails.iter().map(|e| e.email.as_str()).collect();
        assert_eq!(emails, vec!["luna.rivers@lunahealing.com", "info@lunahealing.com"]);
        assert_eq!(info.phones, vec!["+15551234567"]);
    }

    #[tokio::test]
    async fn test_contact_page_missing_is_empty() {
        let ex = extractor(StaticFetcher::new());
        let base = Url::parse("https://quiet.org").expect("url");
        let info = ex.check_contact_page("<p>No links here</p>", &base).await;
        assert!(info.is_empty());

        // Link present but the page cannot be fetched
        let info = ex
            .check_contact_page(r#"<a href="/contact">Contact</a>"#, &base)
            .await;
        assert!(info.is_empty());
    }

    #[tokio::test]
    async fn test_enrich_from_website() {
        let enriched = extractor(site())
            .enrich_healer_contacts(&healer_with_site())
            .await;

        assert_eq!(enriched.email.as_deref(), Some("luna.rivers@lunahealing.com"));
        assert_eq!(enriched.additional_emails, vec!["info@lunahealing.com"]);
        assert_eq!(enriched.phone.as_deref(), Some("+15551234567"));
        assert!((enriched.contact_confidence.value() - 0.8).abs() < 1e-9);
        assert_eq!(
            enriched.notes.as_deref(),
            Some("Contact info: email extracted, phone extracted, website available.")
        );
    }

    #[tokio::test]
    async fn test_reenrichment_is_idempotent() {
        let ex = extractor(site());
        let mut start = healer_with_site();
        start.contact_confidence = Confidence::new(0.95);

        let once = ex.enrich_healer_contacts(&start).await;
        let twice = ex.enrich_healer_contacts(&once).await;

        assert!(twice.contact_confidence >= start.contact_confidence);
        assert_eq!(twice.email, once.email);
        assert_eq!(twice.additional_emails, once.additional_emails);
        assert_eq!(twice.notes, once.notes);
    }

    #[tokio::test]
    async fn test_better_existing_email_is_kept() {
        let mut h = healer_with_site();
        h.email = Some("luna.rivers@gmail.com".to_string());
        let enriched = extractor(site()).enrich_healer_contacts(&h).await;

        assert_eq!(enriched.email.as_deref(), Some("luna.rivers@gmail.com"));
        assert!(enriched
            .additional_emails
            .contains(&"luna.rivers@lunahealing.com".to_string()));
    }

    #[tokio::test]
    async fn test_enrich_from_bio() {
        let mut h = HealerCandidate::new("Sage Moon", "instagram");
        h.bio = Some("Reiki Master ✨ bookings: sage(at)moonreiki(dot)com 555-987-6543".to_string());
        h.contact_confidence = Confidence::new(0.4);

        let enriched = extractor(StaticFetcher::new()).enrich_healer_contacts(&h).await;
        assert_eq!(enriched.email.as_deref(), Some("sage@moonreiki.com"));
        assert_eq!(enriched.phone.as_deref(), Some("+15559876543"));
        assert!((enriched.contact_confidence.value() - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fetch_failure_returns_original() {
        let h = healer_with_site();
        let enriched = extractor(StaticFetcher::new()).enrich_healer_contacts(&h).await;
        assert_eq!(enriched, h);
    }

    #[tokio::test]
    async fn test_batch_stops_at_quota_and_passes_rest_through() {
        let ex = extractor(site());
        // enrichment quota is min(week-1 ramp of 5, 40)
        let healers: Vec<_> = (0..7).map(|_| healer_with_site()).collect();

        let out = ex.batch_enrich(healers).await;
        assert_eq!(out.len(), 7);
        assert_eq!(out.iter().filter(|h| h.has_email()).count(), 5);
        assert!(out[5].email.is_none() && out[6].email.is_none());
    }
}
