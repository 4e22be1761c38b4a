//! Building the discovery sources a run uses.

use crate::error::Result;
use async_trait::async_trait;
use healer_core::{AppConfig, BrowserConfig, DiscoveryConfig, HealerCandidate, PageFetcher};
use healer_discovery::{
    DirectoryDefinition, DirectoryLoader, DirectorySource, DiscoverySource, SocialProfileSource,
};
use healer_ratelimit::RateLimiter;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Social discovery that only launches its browser when it runs.
///
/// Commands like `status` build a pipeline without ever discovering, so the
/// browser must not start until `discover` is called.
pub struct LazySocialSource {
    config: DiscoveryConfig,
    browser: BrowserConfig,
    limiter: Arc<RateLimiter>,
    inner: Option<SocialProfileSource>,
}

impl LazySocialSource {
    /// A source that launches a browser from `browser` on first use.
    #[must_use]
    pub fn new(config: DiscoveryConfig, browser: BrowserConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            config,
            browser,
            limiter,
            inner: None,
        }
    }

    /// Whether the browser has been launched and not yet closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}

#[async_trait]
impl DiscoverySource for LazySocialSource {
    fn name(&self) -> &str {
        "instagram"
    }

    async fn discover(&mut self) -> healer_discovery::Result<Vec<HealerCandidate>> {
        if self.inner.is_none() {
            info!("launching browser for social discovery");
            let source =
                SocialProfileSource::launch(self.config.clone(), &self.browser, self.limiter.clone())
                    .await?;
            self.inner = Some(source);
        }
        match self.inner.as_mut() {
            Some(source) => source.discover().await,
            None => Ok(Vec::new()),
        }
    }

    async fn close(&mut self) -> healer_discovery::Result<()> {
        match self.inner.take() {
            Some(mut source) => source.close().await,
            None => Ok(()),
        }
    }
}

/// Directory definitions to run: the built-in set, with definitions from
/// `pipeline.directories_dir` added or replacing built-ins of the same id.
pub fn directory_definitions(config: &AppConfig) -> Result<Vec<DirectoryDefinition>> {
    let mut by_id: BTreeMap<String, DirectoryDefinition> = DirectoryLoader::builtin()?
        .into_iter()
        .map(|d| (d.id().to_string(), d))
        .collect();

    if let Some(dir) = &config.pipeline.directories_dir {
        let loader = DirectoryLoader::new(dir)?;
        for definition in loader.load_all()? {
            debug!(directory = %definition.id(), "loaded directory definition");
            by_id.insert(definition.id().to_string(), definition);
        }
    }
    Ok(by_id.into_values().collect())
}

/// Sources enabled by `config.pipeline`, in run order: social first, then
/// directories.
pub fn build_sources(
    config: &AppConfig,
    fetcher: &Arc<dyn PageFetcher>,
    limiter: &Arc<RateLimiter>,
) -> Result<Vec<Box<dyn DiscoverySource>>> {
    let mut sources: Vec<Box<dyn DiscoverySource>> = Vec::new();

    if config.pipeline.enable_social {
        sources.push(Box::new(LazySocialSource::new(
            config.discovery.clone(),
            config.browser.clone(),
            limiter.clone(),
        )));
    }

    if config.pipeline.enable_directories {
        for definition in directory_definitions(config)? {
            sources.push(Box::new(DirectorySource::new(
                definition,
                fetcher.clone(),
                limiter.clone(),
            )?));
        }
    }

    info!(
        sources = sources.len(),
        names = ?sources.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
        "discovery sources ready"
    );
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use healer_core::{MemoryStore, RateLimitConfig, Settings, StaticFetcher};
    use tempfile::TempDir;

    fn limiter() -> Arc<RateLimiter> {
        let store = Arc::new(MemoryStore::with_default_settings());
        Arc::new(RateLimiter::new(
            store.clone(),
            Settings::new(store),
            RateLimitConfig::default(),
        ))
    }

    const EXTRA: &str = r#"
search_terms = ["reiki"]

[directory]
id = "holistic_finder"
name = "Holistic Finder"
platform = "wellness_directories"
search_url = "https://holistic.example/search?q={term}"

[selectors]
listing = ".card"
name = ".card h2"
"#;

    #[test]
    fn test_sources_follow_toggles() {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(StaticFetcher::new());
        let mut config = AppConfig::default();

        config.pipeline.enable_social = true;
        config.pipeline.enable_directories = true;
        let sources = build_sources(&config, &fetcher, &limiter()).expect("sources");
        let names: Vec<_> = sources.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names[0], "instagram");
        assert!(names.len() >= 2);

        config.pipeline.enable_social = false;
        config.pipeline.enable_directories = false;
        assert!(build_sources(&config, &fetcher, &limiter())
            .expect("sources")
            .is_empty());
    }

    #[test]
    fn test_definitions_dir_extends_builtins() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("holistic_finder.toml"), EXTRA).expect("write");
        let mut config = AppConfig::default();
        config.pipeline.directories_dir = Some(dir.path().to_path_buf());

        let definitions = directory_definitions(&config).expect("definitions");
        let ids: Vec<_> = definitions.iter().map(DirectoryDefinition::id).collect();
        assert!(ids.contains(&"holistic_finder"));
        assert!(ids.contains(&"psychology_today"));
    }

    #[tokio::test]
    async fn test_lazy_social_close_without_launch() {
        let mut source = LazySocialSource::new(
            DiscoveryConfig::default(),
            BrowserConfig::default(),
            limiter(),
        );
        assert!(!source.is_open());
        source.close().await.expect("close is a no-op");
    }
}
