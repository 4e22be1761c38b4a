//! Hashtag-driven discovery on a social photo platform.
//!
//! The source walks hashtag pages, opens a few profiles per tag and keeps
//! the ones whose bio reads like a healing practice. Pages come through a
//! [`PageFetcher`], normally a [`BrowserSession`] since the site renders
//! client side.

use crate::error::{DiscoveryError, Result};
use crate::source::{block_marker, DiscoverySource};
use async_trait::async_trait;
use healer_browser::BrowserSession;
use healer_core::taxonomy::{mentions_any, specialties_in, QUALIFICATION_KEYWORDS};
use healer_core::{
    BrowserConfig, Confidence, DiscoveryConfig, HealerCandidate, HealerError, PageFetcher,
};
use healer_ratelimit::{pause, RateLimiter};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const PLATFORM: &str = "instagram";
const PROFILE_VIEW: &str = "profile_view";

/// First path segments that are never usernames.
const RESERVED_PATHS: &[&str] = &[
    "p", "reel", "reels", "explore", "accounts", "stories", "direct", "about", "legal",
    "developer", "tv", "web", "directory",
];

static COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([km])?").expect("Count regex is hardcoded and valid")
});

static META_FOLLOWERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\d.,]+\s*[km]?)\s+followers")
        .expect("Followers regex is hardcoded and valid")
});

static META_POSTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\d.,]+\s*[km]?)\s+posts").expect("Posts regex is hardcoded and valid")
});

static LOCATION_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(r"📍\s*([^\n|•·]+)").expect("Pin location regex is hardcoded and valid"),
        Regex::new(r"(?i)located in\s+([^\n|•·.!]+)")
            .expect("Located-in regex is hardcoded and valid"),
        Regex::new(r"(?i)based in\s+([^\n|•·.!]+)")
            .expect("Based-in regex is hardcoded and valid"),
        Regex::new(r"\b([A-Z][a-zA-Z]+(?:\s[A-Z][a-zA-Z]+)*,\s*[A-Z]{2})\b")
            .expect("City-state regex is hardcoded and valid"),
    ]
});

struct ProfileSelectors {
    name: Selector,
    bio: Selector,
    followers: Selector,
    posts: Selector,
    website: Selector,
    image: Selector,
    og_title: Selector,
    description: Selector,
    anchors: Selector,
}

static SELECTORS: Lazy<ProfileSelectors> = Lazy::new(|| {
    let parse = |css: &str| Selector::parse(css).expect("Profile selector is hardcoded and valid");
    ProfileSelectors {
        name: parse("header h2, header h1"),
        bio: parse(r#"header [data-testid="user-bio"], header section div span"#),
        followers: parse(r#"header a[href*="/followers/"] span"#),
        posts: parse("header section ul li span"),
        website: parse(r#"header a[href^="http"]"#),
        image: parse("header img"),
        og_title: parse(r#"meta[property="og:title"]"#),
        description: parse(r#"meta[name="description"]"#),
        anchors: parse(r#"a[href^="/"]"#),
    }
});

/// What a profile page says about its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialProfile {
    /// Handle, without `@`
    pub username: String,
    /// Display name
    pub name: String,
    /// Bio text
    pub bio: Option<String>,
    /// External link in the bio
    pub website: Option<String>,
    /// Follower count
    pub followers: Option<u64>,
    /// Post count
    pub posts: Option<u64>,
    /// Avatar URL
    pub image_url: Option<String>,
}

impl SocialProfile {
    /// Whether the profile is worth contacting: a real name, a follower
    /// count inside `min..=max`, and healing words in the bio or name.
    #[must_use]
    pub fn qualifies(&self, min_followers: u64, max_followers: u64) -> bool {
        if self.name.trim().chars().count() < 2 {
            return false;
        }
        let Some(followers) = self.followers else {
            return false;
        };
        if !(min_followers..=max_followers).contains(&followers) {
            return false;
        }
        let text = format!("{} {}", self.name, self.bio.as_deref().unwrap_or_default());
        mentions_any(&text, QUALIFICATION_KEYWORDS)
    }

    /// Contact confidence: 0.3 base, +0.3 website, +0.2 for 500..=10 000
    /// followers, +0.1 for more than 10 posts, +0.1 for a bio over 50 chars.
    #[must_use]
    pub fn confidence(&self) -> Confidence {
        let mut score = 0.3;
        if self.website.is_some() {
            score += 0.3;
        }
        if self.followers.is_some_and(|f| (500..=10_000).contains(&f)) {
            score += 0.2;
        }
        if self.posts.is_some_and(|p| p > 10) {
            score += 0.1;
        }
        if self.bio.as_deref().is_some_and(|b| b.chars().count() > 50) {
            score += 0.1;
        }
        Confidence::new(score)
    }
}

/// Parse `1,234`, `1.2K` or `3.4M` into a count.
#[must_use]
pub fn parse_count(text: &str) -> Option<u64> {
    let caps = COUNT.captures(text)?;
    let number = caps[1].replace(',', "");
    let suffix = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
    let multiplier = match suffix.as_deref() {
        Some("k") => 1_000.0,
        Some("m") => 1_000_000.0,
        _ => 1.0,
    };
    let value: f64 = number.parse().ok()?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = (value * multiplier).round() as u64;
    Some(count)
}

/// Location mentioned in a bio: `📍 City`, `Located in ...`, `Based in ...`
/// or a `City, ST` pair.
#[must_use]
pub fn location_from_bio(bio: &str) -> Option<String> {
    LOCATION_PATTERNS.iter().find_map(|pattern| {
        let found = pattern.captures(bio)?.get(1)?.as_str().trim();
        Some(found.to_string()).filter(|s| !s.is_empty())
    })
}

/// Usernames linked from a hashtag page, in page order, at most `limit`.
#[must_use]
pub fn profile_links(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&SELECTORS.anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| {
            let path = href.split(['?', '#']).next()?.trim_matches('/');
            let mut segments = path.split('/');
            let username = segments.next()?;
            if segments.next().is_some() || username.is_empty() {
                return None;
            }
            let valid = username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
            (valid && !RESERVED_PATHS.contains(&username)).then(|| username.to_string())
        })
        .filter(|username| seen.insert(username.clone()))
        .take(limit)
        .collect()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).find_map(|element| {
        let text = element.text().collect::<String>().trim().to_string();
        Some(text).filter(|t| !t.is_empty())
    })
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()?
        .value()
        .attr("content")
        .map(str::to_string)
}

/// Unwrap the platform's link shim (`l.instagram.com/?u=...`).
fn external_link(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let host = url.host_str()?;
    if host == "l.instagram.com" {
        return url
            .query_pairs()
            .find(|(k, _)| k == "u")
            .map(|(_, v)| v.into_owned());
    }
    if host.ends_with("instagram.com") {
        return None;
    }
    Some(href.to_string())
}

/// Read a rendered profile page.
#[must_use]
pub fn parse_profile(html: &str, username: &str) -> SocialProfile {
    let document = Html::parse_document(html);
    let s = &*SELECTORS;
    let description = meta_content(&document, &s.description).unwrap_or_default();

    let name = first_text(&document, &s.name)
        .or_else(|| {
            let title = meta_content(&document, &s.og_title)?;
            let name = title.split(" (@").next()?.trim().to_string();
            Some(name).filter(|n| !n.is_empty())
        })
        .unwrap_or_else(|| username.to_string());

    let followers = document
        .select(&s.followers)
        .next()
        .and_then(|span| {
            span.value()
                .attr("title")
                .and_then(parse_count)
                .or_else(|| parse_count(&span.text().collect::<String>()))
        })
        .or_else(|| parse_count(META_FOLLOWERS.captures(&description)?.get(1)?.as_str()));

    let posts = first_text(&document, &s.posts)
        .and_then(|t| parse_count(&t))
        .or_else(|| parse_count(META_POSTS.captures(&description)?.get(1)?.as_str()));

    let website = document
        .select(&s.website)
        .filter_map(|a| a.value().attr("href"))
        .find_map(external_link);

    let image_url = document
        .select(&s.image)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    SocialProfile {
        username: username.to_string(),
        name,
        bio: first_text(&document, &s.bio),
        website,
        followers,
        posts,
        image_url,
    }
}

/// Discovers healers through hashtag pages on the social platform.
pub struct SocialProfileSource {
    config: DiscoveryConfig,
    fetcher: Arc<dyn PageFetcher>,
    limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for SocialProfileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialProfileSource")
            .field("hashtags", &self.config.hashtags.len())
            .finish_non_exhaustive()
    }
}

impl SocialProfileSource {
    /// Build a source over any page fetcher.
    #[must_use]
    pub fn new(
        config: DiscoveryConfig,
        fetcher: Arc<dyn PageFetcher>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            config,
            fetcher,
            limiter,
        }
    }

    /// Launch a browser session and build a source over it. The browser is
    /// shut down by [`DiscoverySource::close`].
    pub async fn launch(
        config: DiscoveryConfig,
        browser: &BrowserConfig,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let session = BrowserSession::launch(browser).await?;
        Ok(Self::new(config, Arc::new(session), limiter))
    }

    fn base_url(&self) -> &str {
        self.config.social_base_url.trim_end_matches('/')
    }

    fn hashtag_url(&self, tag: &str) -> String {
        format!("{}/explore/tags/{}/", self.base_url(), urlencoding::encode(tag))
    }

    fn profile_url(&self, username: &str) -> String {
        format!("{}/{username}/", self.base_url())
    }

    async fn fetch_page(&self, url: &str) -> Result<Option<String>> {
        match self.fetcher.fetch(url).await {
            Ok(html) => match block_marker(&html) {
                Some(marker) => Err(DiscoveryError::Blocked {
                    platform: PLATFORM.to_string(),
                    reason: format!("{marker} page at {url}"),
                }),
                None => Ok(Some(html)),
            },
            Err(HealerError::Blocked(reason)) => Err(DiscoveryError::Blocked {
                platform: PLATFORM.to_string(),
                reason,
            }),
            Err(e) => {
                warn!(url = %url, error = %e, "social page fetch failed");
                Ok(None)
            }
        }
    }

    /// Convert a qualified profile into a candidate.
    #[must_use]
    pub fn profile_to_candidate(&self, profile: &SocialProfile) -> HealerCandidate {
        let bio = profile.bio.as_deref().unwrap_or_default();
        let mut healer = HealerCandidate::new(profile.name.clone(), PLATFORM);
        healer.bio = profile.bio.clone();
        healer.website = profile.website.clone();
        healer.instagram = Some(format!("{}/{}", self.base_url(), profile.username));
        healer.location = location_from_bio(bio);
        healer.specialties = specialties_in(&format!("{} {bio}", profile.name));
        healer.follower_count = profile.followers;
        healer.profile_image_url = profile.image_url.clone();
        healer.contact_confidence = profile.confidence();
        healer.append_note(&format!(
            "Discovered via Instagram. {} posts, {} followers.",
            profile.posts.unwrap_or(0),
            profile.followers.unwrap_or(0)
        ));
        healer
    }

    /// Denial reason when the next profile view is not allowed.
    async fn denied(&self) -> Option<String> {
        let decision = self.limiter.can_perform_action(PLATFORM, PROFILE_VIEW).await;
        (!decision.allowed).then(|| decision.reason.unwrap_or_default())
    }
}

#[async_trait]
impl DiscoverySource for SocialProfileSource {
    fn name(&self) -> &str {
        "Instagram"
    }

    async fn discover(&mut self) -> Result<Vec<HealerCandidate>> {
        let delays = self.limiter.delays();
        let mut visited = HashSet::new();
        let mut healers = Vec::new();

        'hashtags: for tag in self.config.hashtags.clone() {
            if let Some(reason) = self.denied().await {
                info!(reason = %reason, "social discovery stopped by rate limiter");
                break;
            }

            let Some(tag_page) = self.fetch_page(&self.hashtag_url(&tag)).await? else {
                continue;
            };
            let usernames = profile_links(&tag_page, self.config.profiles_per_hashtag);
            debug!(hashtag = %tag, profiles = usernames.len(), "collected profile links");

            for username in usernames {
                if !visited.insert(username.clone()) {
                    continue;
                }
                if let Some(reason) = self.denied().await {
                    info!(reason = %reason, "social discovery stopped by rate limiter");
                    break 'hashtags;
                }

                let page = self.fetch_page(&self.profile_url(&username)).await?;
                if let Err(e) = self.limiter.record_action(PLATFORM, PROFILE_VIEW).await {
                    warn!(error = %e, "failed to record profile view");
                }

                if let Some(html) = page {
                    let profile = parse_profile(&html, &username);
                    if profile.qualifies(self.config.min_followers, self.config.max_followers) {
                        debug!(
                            username = %username,
                            followers = ?profile.followers,
                            "qualified profile"
                        );
                        healers.push(self.profile_to_candidate(&profile));
                    }
                }

                pause(delays.random_delay()).await;
            }
        }

        info!(count = healers.len(), "social discovery complete");
        Ok(healers)
    }

    async fn close(&mut self) -> Result<()> {
        self.fetcher.close().await?;
        Ok(())
    }
}
