//! Listing-directory discovery driven by [`DirectoryDefinition`]s.

use crate::definition::DirectoryDefinition;
use crate::error::{DiscoveryError, Result};
use crate::source::{block_marker, DiscoverySource};
use async_trait::async_trait;
use healer_core::taxonomy::{mentions_any, specialties_in, SPIRITUAL_LISTING_KEYWORDS};
use healer_core::{Confidence, HealerCandidate, HealerError, PageFetcher};
use healer_extract::{normalize_phone, resolve_url};
use healer_ratelimit::{pause, RateLimiter};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const SEARCH_ACTION: &str = "search";

static YEARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*years?").expect("Years regex is hardcoded and valid")
});

/// One result card as scraped, before filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Practitioner name
    pub name: String,
    /// Absolute profile URL
    pub profile_url: Option<String>,
    /// Location text
    pub location: Option<String>,
    /// Phone text as shown
    pub phone: Option<String>,
    /// Absolute website URL
    pub website: Option<String>,
    /// Bio preview
    pub bio: Option<String>,
    /// Credentials line
    pub credentials: Option<String>,
    /// Specialties text
    pub specialties: Option<String>,
}

impl Listing {
    /// Whether the bio or specialties read as a spiritual practice.
    #[must_use]
    pub fn is_spiritual(&self) -> bool {
        let text = format!(
            "{} {}",
            self.bio.as_deref().unwrap_or_default(),
            self.specialties.as_deref().unwrap_or_default()
        );
        mentions_any(&text, SPIRITUAL_LISTING_KEYWORDS)
    }

    /// Contact confidence: 0.6 base, +0.2 phone, +0.2 website, +0.1 long
    /// bio, +0.1 credentials, capped at 1.0.
    #[must_use]
    pub fn confidence(&self) -> Confidence {
        let mut score = 0.6;
        if self.phone.is_some() {
            score += 0.2;
        }
        if self.website.is_some() {
            score += 0.2;
        }
        if self.bio.as_deref().is_some_and(|b| b.chars().count() > 100) {
            score += 0.1;
        }
        if self.credentials.is_some() {
            score += 0.1;
        }
        Confidence::new(score)
    }
}

struct CompiledSelectors {
    listing: Selector,
    name: Selector,
    link: Option<Selector>,
    location: Option<Selector>,
    phone: Option<Selector>,
    website: Option<Selector>,
    bio: Option<Selector>,
    credentials: Option<Selector>,
    specialties: Option<Selector>,
}

impl CompiledSelectors {
    fn compile(definition: &DirectoryDefinition) -> Result<Self> {
        let parse = |field: &str, css: &str| {
            Selector::parse(css).map_err(|e| DiscoveryError::ValidationError {
                directory_id: definition.id().to_string(),
                reason: format!("selector '{field}' does not parse: {e}"),
            })
        };
        let optional = |field: &str, css: &Option<String>| {
            css.as_deref().map(|c| parse(field, c)).transpose()
        };

        let s = &definition.selectors;
        Ok(Self {
            listing: parse("listing", &s.listing)?,
            name: parse("name", &s.name)?,
            link: optional("link", &s.link)?,
            location: optional("location", &s.location)?,
            phone: optional("phone", &s.phone)?,
            website: optional("website", &s.website)?,
            bio: optional("bio", &s.bio)?,
            credentials: optional("credentials", &s.credentials)?,
            specialties: optional("specialties", &s.specialties)?,
        })
    }
}

fn text_of(card: ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    let element = card.select(selector?).next()?;
    let text = element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some(text).filter(|t| !t.is_empty())
}

fn href_of(card: ElementRef<'_>, selector: Option<&Selector>, base: &Url) -> Option<String> {
    let href = card.select(selector?).next()?.value().attr("href")?;
    resolve_url(base, href).map(String::from)
}

/// Discovers practitioners from a listing directory.
pub struct DirectorySource {
    definition: DirectoryDefinition,
    selectors: CompiledSelectors,
    fetcher: Arc<dyn PageFetcher>,
    limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for DirectorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySource")
            .field("directory", &self.definition.id())
            .finish_non_exhaustive()
    }
}

impl DirectorySource {
    /// Build a source for one definition.
    ///
    /// # Errors
    /// Returns error if the definition does not validate.
    pub fn new(
        definition: DirectoryDefinition,
        fetcher: Arc<dyn PageFetcher>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        definition.validate()?;
        let selectors = CompiledSelectors::compile(&definition)?;
        Ok(Self {
            definition,
            selectors,
            fetcher,
            limiter,
        })
    }

    /// The definition driving this source.
    #[must_use]
    pub fn definition(&self) -> &DirectoryDefinition {
        &self.definition
    }

    /// Every result card on a search page, up to the per-page cap.
    #[must_use]
    pub fn parse_listings(&self, html: &str, page_url: &str) -> Vec<Listing> {
        let Ok(base) = Url::parse(page_url) else {
            return Vec::new();
        };
        let document = Html::parse_document(html);
        let s = &self.selectors;

        document
            .select(&s.listing)
            .filter_map(|card| {
                let name = text_of(card, Some(&s.name))?;
                Some(Listing {
                    name,
                    profile_url: href_of(card, s.link.as_ref(), &base),
                    location: text_of(card, s.location.as_ref()),
                    phone: text_of(card, s.phone.as_ref()),
                    website: href_of(card, s.website.as_ref(), &base),
                    bio: text_of(card, s.bio.as_ref()),
                    credentials: text_of(card, s.credentials.as_ref()),
                    specialties: text_of(card, s.specialties.as_ref()),
                })
            })
            .take(self.definition.directory.max_listings_per_page)
            .collect()
    }

    /// Turn a spiritual listing into a candidate. Non-spiritual listings
    /// give `None`.
    #[must_use]
    pub fn listing_to_candidate(
        &self,
        listing: &Listing,
        searched_location: &str,
    ) -> Option<HealerCandidate> {
        if !listing.is_spiritual() {
            return None;
        }

        let mut healer = HealerCandidate::new(listing.name.clone(), self.definition.platform());
        healer.location = listing
            .location
            .clone()
            .or_else(|| Some(searched_location.to_string()).filter(|l| !l.is_empty()));
        healer.phone = listing.phone.as_deref().and_then(normalize_phone);
        healer.website = listing.website.clone();
        healer.bio = listing.bio.clone();
        healer.specialties = specialties_in(&format!(
            "{} {}",
            listing.specialties.as_deref().unwrap_or_default(),
            listing.bio.as_deref().unwrap_or_default()
        ));
        healer.years_experience = listing
            .bio
            .as_deref()
            .and_then(|bio| YEARS.captures(bio))
            .and_then(|c| c[1].parse().ok());
        healer.certifications = listing
            .credentials
            .as_deref()
            .map(|c| {
                c.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        healer.contact_confidence = listing.confidence();

        let mut note = format!("Found on {}.", self.definition.name());
        if let Some(credentials) = &listing.credentials {
            note.push_str(&format!(" {credentials}."));
        }
        if let Some(profile) = &listing.profile_url {
            note.push_str(&format!(" Profile: {profile}"));
        }
        healer.append_note(&note);

        Some(healer)
    }

    async fn search_page(&self, term: &str, location: &str) -> Result<Option<Vec<HealerCandidate>>> {
        let url = self.definition.search_url(term, location);
        debug!(directory = %self.definition.id(), url = %url, "searching directory");

        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(HealerError::Blocked(reason)) => {
                return Err(DiscoveryError::Blocked {
                    platform: self.definition.platform().to_string(),
                    reason,
                })
            }
            Err(e) => {
                warn!(url = %url, error = %e, "directory search failed");
                return Ok(None);
            }
        };

        if let Some(marker) = block_marker(&html) {
            return Err(DiscoveryError::Blocked {
                platform: self.definition.platform().to_string(),
                reason: format!("{marker} page at {url}"),
            });
        }

        let listings = self.parse_listings(&html, &url);
        let healers: Vec<_> = listings
            .iter()
            .filter_map(|l| self.listing_to_candidate(l, location))
            .collect();
        debug!(
            term = %term,
            location = %location,
            listings = listings.len(),
            kept = healers.len(),
            "parsed directory page"
        );
        Ok(Some(healers))
    }
}

#[async_trait]
impl DiscoverySource for DirectorySource {
    fn name(&self) -> &str {
        self.definition.name()
    }

    async fn discover(&mut self) -> Result<Vec<HealerCandidate>> {
        let platform = self.definition.platform().to_string();
        let delays = self.limiter.delays();
        let mut seen = HashSet::new();
        let mut healers = Vec::new();

        for (term, location) in self.definition.search_pairs() {
            let decision = self.limiter.can_perform_action(&platform, SEARCH_ACTION).await;
            if !decision.allowed {
                info!(
                    directory = %self.definition.id(),
                    reason = decision.reason.as_deref().unwrap_or_default(),
                    "directory discovery stopped by rate limiter"
                );
                break;
            }

            let page = self.search_page(&term, &location).await?;

            if let Err(e) = self.limiter.record_action(&platform, SEARCH_ACTION).await {
                warn!(error = %e, "failed to record directory search");
            }

            for healer in page.unwrap_or_default() {
                let key = (
                    healer.name.to_lowercase(),
                    healer.location.clone().unwrap_or_default().to_lowercase(),
                );
                if seen.insert(key) {
                    healers.push(healer);
                }
            }

            pause(delays.random_delay()).await;
        }

        info!(
            directory = %self.definition.id(),
            count = healers.len(),
            "directory discovery complete"
        );
        Ok(healers)
    }

    async fn close(&mut self) -> Result<()> {
        self.fetcher.close().await?;
        Ok(())
    }
}
