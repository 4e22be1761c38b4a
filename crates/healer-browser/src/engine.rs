use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use futures_util::stream::StreamExt;
use healer_core::{BrowserConfig, PageFetcher};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A controlled Chromium instance.
///
/// The session is an explicit resource: call [`BrowserSession::shutdown`]
/// (or `PageFetcher::close`) when done. Fetches after that fail with
/// [`BrowserError::Closed`].
pub struct BrowserSession {
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    fingerprint: FingerprintConfig,
    navigation_timeout: Duration,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("fingerprint", &self.fingerprint)
            .field("navigation_timeout", &self.navigation_timeout)
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    /// Launch Chromium with the configured window and a randomized user agent
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let fingerprint = FingerprintConfig::for_config(config);
        let navigation_timeout = Duration::from_secs(config.navigation_timeout_secs);

        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .request_timeout(navigation_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", fingerprint.user_agent));
        if !config.headless {
            builder = builder.with_head();
        }
        let chrome_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Drive the CDP event loop until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(
            headless = config.headless,
            width = fingerprint.viewport_width,
            height = fingerprint.viewport_height,
            "browser session launched"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler_task)),
            fingerprint,
            navigation_timeout,
        })
    }

    /// Open `url` in a fresh tab and return the rendered HTML
    pub async fn page_html(&self, url: &str) -> Result<String> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().ok_or(BrowserError::Closed)?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let result = async {
            page.set_user_agent(self.fingerprint.user_agent.as_str())
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            tokio::time::timeout(self.navigation_timeout, page.goto(url))
                .await
                .map_err(|_| BrowserError::Timeout(format!("navigating to {url}")))?
                .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
            page.content()
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))
        }
        .await;

        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "failed to close tab");
        }
        result
    }

    /// Close the browser and stop its event loop. Safe to call twice.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!(error = %e, "browser did not close cleanly");
            }
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "waiting for browser exit failed");
            }
            tracing::info!("browser session closed");
        }
        if let Some(task) = self.handler.lock().await.take() {
            task.abort();
        }
        Ok(())
    }

    /// Whether [`BrowserSession::shutdown`] has run
    pub async fn is_closed(&self) -> bool {
        self.browser.lock().await.is_none()
    }
}

#[async_trait]
impl PageFetcher for BrowserSession {
    async fn fetch(&self, url: &str) -> healer_core::Result<String> {
        Ok(self.page_html(url).await?)
    }

    async fn close(&self) -> healer_core::Result<()> {
        Ok(self.shutdown().await?)
    }
}
