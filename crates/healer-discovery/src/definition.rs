//! Directory definition types.
//!
//! A directory definition describes one listing site: how to build its
//! search URLs and which CSS selectors pull a practitioner out of a result
//! card. Definitions are TOML files so new directories need no code.

use crate::error::{DiscoveryError, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// A complete directory definition loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryDefinition {
    /// Search terms substituted for `{term}`
    pub search_terms: Vec<String>,

    /// Locations substituted for `{location}`
    #[serde(default)]
    pub locations: Vec<String>,

    /// Site metadata
    pub directory: DirectoryMetadata,

    /// Listing selectors
    pub selectors: ListingSelectors,
}

impl DirectoryDefinition {
    /// Parse a definition from TOML text.
    pub fn from_toml(source: &str, origin: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| DiscoveryError::ParseError {
            path: origin.to_string(),
            source: e,
        })
    }

    /// Get the directory ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.directory.id
    }

    /// Get the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.directory.name
    }

    /// Platform tag used for rate limits and `source_platform`.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.directory.platform
    }

    /// Search URL for one term and location, both percent-encoded.
    #[must_use]
    pub fn search_url(&self, term: &str, location: &str) -> String {
        self.directory
            .search_url
            .replace("{term}", &urlencoding::encode(term))
            .replace("{location}", &urlencoding::encode(location))
    }

    /// Every (term, location) pair in definition order, terms outermost.
    ///
    /// A definition without locations searches each term once with an
    /// empty location.
    #[must_use]
    pub fn search_pairs(&self) -> Vec<(String, String)> {
        let locations: Vec<&str> = if self.locations.is_empty() {
            vec![""]
        } else {
            self.locations.iter().map(String::as_str).collect()
        };
        self.search_terms
            .iter()
            .flat_map(|term| {
                locations
                    .iter()
                    .map(move |location| (term.clone(), (*location).to_string()))
            })
            .collect()
    }

    /// Validate the definition.
    ///
    /// # Errors
    /// Returns error if required fields are missing, the search URL has no
    /// `{term}` placeholder, or a selector does not parse.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| DiscoveryError::ValidationError {
            directory_id: self.directory.id.clone(),
            reason,
        };

        if self.directory.id.is_empty()
            || !self
                .directory
                .id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(invalid(
                "id must be non-empty lowercase letters, digits, '-' or '_'".to_string(),
            ));
        }
        if self.directory.name.trim().is_empty() {
            return Err(invalid("name cannot be empty".to_string()));
        }
        if self.directory.platform.trim().is_empty() {
            return Err(invalid("platform cannot be empty".to_string()));
        }

        let template = &self.directory.search_url;
        if !(template.starts_with("https://") || template.starts_with("http://")) {
            return Err(invalid(format!("search_url must be http(s): {template}")));
        }
        if !template.contains("{term}") {
            return Err(invalid("search_url must contain {term}".to_string()));
        }
        if template.contains("{location}") && self.locations.is_empty() {
            return Err(invalid(
                "search_url uses {location} but no locations are listed".to_string(),
            ));
        }
        if self.search_terms.iter().all(|t| t.trim().is_empty()) {
            return Err(invalid("at least one search term is required".to_string()));
        }
        if self.directory.max_listings_per_page == 0 {
            return Err(invalid("max_listings_per_page must be at least 1".to_string()));
        }

        for (field, selector) in self.selectors.fields() {
            Selector::parse(selector)
                .map_err(|e| invalid(format!("selector '{field}' does not parse: {e}")))?;
        }

        Ok(())
    }
}

/// Directory site metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryMetadata {
    /// Unique identifier, also the file stem
    pub id: String,

    /// Display name
    pub name: String,

    /// Platform tag for rate limits
    pub platform: String,

    /// Site home page
    #[serde(default)]
    pub url: Option<String>,

    /// Search URL template with `{term}` and optional `{location}`
    pub search_url: String,

    /// Listings taken from one result page
    #[serde(default = "default_max_listings")]
    pub max_listings_per_page: usize,
}

fn default_max_listings() -> usize {
    10
}

/// CSS selectors for one result card. All but `listing` and `name` are
/// looked up inside the card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// One result card
    pub listing: String,

    /// Practitioner name
    pub name: String,

    /// Link to the full profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// City and state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Practice website link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Bio preview
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Credentials line (e.g. "LMFT, Reiki Master")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    /// Specialties list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialties: Option<String>,
}

impl ListingSelectors {
    /// Every configured selector with its field name.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let optional = [
            ("link", &self.link),
            ("location", &self.location),
            ("phone", &self.phone),
            ("website", &self.website),
            ("bio", &self.bio),
            ("credentials", &self.credentials),
            ("specialties", &self.specialties),
        ];
        [("listing", self.listing.as_str()), ("name", self.name.as_str())]
            .into_iter()
            .chain(
                optional
                    .into_iter()
                    .filter_map(|(field, value)| value.as_deref().map(|v| (field, v))),
            )
    }
}
