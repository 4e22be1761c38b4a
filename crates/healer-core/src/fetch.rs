//! Page fetching seam shared by the contact extractor and discovery sources.

use crate::error::{HealerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Fetches a page and returns its HTML.
///
/// Implemented over plain HTTP in `healer-extract` and over a controlled
/// browser in `healer-browser`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<String>;

    /// Release any resources behind the fetcher. Idempotent.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Serves canned pages keyed by URL. Unknown URLs are a network error.
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| HealerError::Network(format!("no page for {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticFetcher::new().with_page("https://a.com", "<p>hi</p>");
        assert_eq!(fetcher.fetch("https://a.com").await.expect("page"), "<p>hi</p>");
        assert!(matches!(
            fetcher.fetch("https://b.com").await,
            Err(HealerError::Network(_))
        ));
    }
}
