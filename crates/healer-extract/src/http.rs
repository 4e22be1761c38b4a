//! Plain HTTP page fetching.

use crate::error::Result;
use async_trait::async_trait;
use healer_core::{DiscoveryConfig, HealerError, PageFetcher};
use reqwest::StatusCode;
use std::time::Duration;

/// [`PageFetcher`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client with the configured timeout and user agent.
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> healer_core::Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HealerError::Network(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            return Err(HealerError::Blocked(format!("HTTP {status} from {url}")));
        }
        if !status.is_success() {
            return Err(HealerError::Network(format!("HTTP {status} for {url}")));
        }

        response
            .text()
            .await
            .map_err(|e| HealerError::Network(format!("failed to read body of {url}: {e}")))
    }
}
