//! Configuration management.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/healer-search/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Which pipeline phases run
    pub pipeline: PipelineConfig,
    /// Per-platform quotas and the progressive ramp
    pub rate_limits: RateLimitConfig,
    /// Pacing delays
    pub delays: DelayConfig,
    /// Outreach email settings
    pub outreach: OutreachConfig,
    /// Export settings
    pub export: ExportConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Discovery source settings
    pub discovery: DiscoveryConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, falling back to defaults if
    /// it does not exist.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// See [`AppConfig::apply_env`] for the recognized variables.
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Supports:
    /// - `HEALER_DRY_RUN`: suppress every send (true/false)
    /// - `HEALER_ENABLE_DIRECTORIES`, `HEALER_ENABLE_SOCIAL`, `HEALER_ENABLE_OUTREACH`
    /// - `HEALER_DB_PATH`, `HEALER_EXPORT_DIR`, `HEALER_TEMPLATES_DIR`
    /// - `HEALER_SMTP_HOST`, `HEALER_SMTP_PORT`, `HEALER_SMTP_USER`, `HEALER_SMTP_PASS`
    /// - `HEALER_FROM_NAME`, `HEALER_HEADLESS`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
            lookup(key).and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            })
        }

        if let Some(dry_run) = flag(&lookup, "HEALER_DRY_RUN") {
            self.general.dry_run = dry_run;
            tracing::debug!("Override general.dry_run from env: {}", dry_run);
        }
        if let Some(enabled) = flag(&lookup, "HEALER_ENABLE_DIRECTORIES") {
            self.pipeline.enable_directories = enabled;
        }
        if let Some(enabled) = flag(&lookup, "HEALER_ENABLE_SOCIAL") {
            self.pipeline.enable_social = enabled;
        }
        if let Some(enabled) = flag(&lookup, "HEALER_ENABLE_OUTREACH") {
            self.pipeline.enable_outreach = enabled;
        }
        if let Some(headless) = flag(&lookup, "HEALER_HEADLESS") {
            self.browser.headless = headless;
        }
        if let Some(path) = lookup("HEALER_DB_PATH") {
            self.general.database_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("HEALER_EXPORT_DIR") {
            self.export.dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("HEALER_TEMPLATES_DIR") {
            self.general.templates_dir = Some(PathBuf::from(dir));
        }
        if let Some(host) = lookup("HEALER_SMTP_HOST") {
            self.outreach.smtp.host = host;
        }
        if let Some(port) = lookup("HEALER_SMTP_PORT").and_then(|p| p.trim().parse().ok()) {
            self.outreach.smtp.port = port;
        }
        if let Some(user) = lookup("HEALER_SMTP_USER") {
            self.outreach.smtp.username = Some(user);
        }
        if let Some(pass) = lookup("HEALER_SMTP_PASS") {
            self.outreach.smtp.password = Some(pass);
        }
        if let Some(name) = lookup("HEALER_FROM_NAME") {
            self.outreach.from_name = name;
        }
    }

    /// Whether emails will actually be sent by a run.
    #[must_use]
    pub fn sends_email(&self) -> bool {
        self.pipeline.enable_outreach && !self.general.dry_run
    }

    /// Check settings that must hold before any external action.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingCredentials` when sends are enabled but
    /// SMTP credentials are absent, and `InvalidValue` for inconsistent
    /// ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sends_email() && !self.outreach.smtp.has_credentials() {
            return Err(ConfigError::MissingCredentials);
        }
        if self.delays.min_secs > self.delays.max_secs {
            return Err(ConfigError::InvalidValue {
                field: "delays.min_secs".to_string(),
                reason: format!(
                    "must not exceed delays.max_secs ({} > {})",
                    self.delays.min_secs, self.delays.max_secs
                ),
            });
        }
        if self.outreach.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "outreach.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.discovery.min_followers > self.discovery.max_followers {
            return Err(ConfigError::InvalidValue {
                field: "discovery.min_followers".to_string(),
                reason: "must not exceed discovery.max_followers".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Database file location: the configured path or `healers.db` in the
    /// data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.general.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("healers.db")),
        }
    }

    fn project_dirs() -> ConfigResult<ProjectDirs> {
        ProjectDirs::from("com", "commonsoul", "healer-search").ok_or(ConfigError::NoConfigDir)
    }
}

/// General settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Run everything except sending email
    pub dry_run: bool,
    /// Database file (defaults to the data directory)
    pub database_path: Option<PathBuf>,
    /// Directory of `*.html` outreach templates overriding the built-ins
    pub templates_dir: Option<PathBuf>,
}

/// Which pipeline phases and sources are enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PipelineConfig {
    /// Directory listing sources
    pub enable_directories: bool,
    /// Social profile source
    pub enable_social: bool,
    /// Outreach phase
    pub enable_outreach: bool,
    /// Export phase
    pub enable_export: bool,
    /// Extra directory definition TOML files
    pub directories_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_directories: true,
            enable_social: true,
            enable_outreach: true,
            enable_export: true,
            directories_dir: None,
        }
    }
}

/// Daily and hourly quota for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformQuota {
    /// Hard daily ceiling
    pub daily: u32,
    /// Rolling one-hour ceiling, if any
    #[serde(default)]
    pub hourly: Option<u32>,
}

/// Progressive ramp parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressiveConfig {
    /// Limit in week 1
    pub starting_limit: u32,
    /// Added each week
    pub weekly_increase: u32,
    /// Ceiling the ramp never exceeds
    pub max_limit: u32,
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            starting_limit: 5,
            weekly_increase: 3,
            max_limit: 25,
        }
    }
}

/// Weekend blackout window, local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekendConfig {
    /// Friday hour the blackout starts
    pub friday_start_hour: u32,
    /// Monday hour the blackout ends
    pub monday_end_hour: u32,
}

impl Default for WeekendConfig {
    fn default() -> Self {
        Self {
            friday_start_hour: 18,
            monday_end_hour: 9,
        }
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Quotas keyed by platform tag
    pub platforms: BTreeMap<String, PlatformQuota>,
    /// Progressive ramp
    pub progressive: ProgressiveConfig,
    /// Weekend blackout window
    pub weekend: WeekendConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let quota = |daily, hourly| PlatformQuota { daily, hourly };
        let platforms = [
            ("instagram", quota(12, Some(8))),
            ("email", quota(25, Some(5))),
            ("psychology_today", quota(8, None)),
            ("wellness_directories", quota(10, None)),
            ("google_my_business", quota(7, None)),
            ("linkedin", quota(15, None)),
            ("enrichment", quota(40, Some(20))),
        ]
        .into_iter()
        .map(|(name, q)| (name.to_string(), q))
        .collect();

        Self {
            platforms,
            progressive: ProgressiveConfig::default(),
            weekend: WeekendConfig::default(),
        }
    }
}

/// Pacing delays, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Shortest inter-action delay
    pub min_secs: u64,
    /// Longest inter-action delay
    pub max_secs: u64,
    /// Base pause between discovery platforms
    pub between_platforms_secs: u64,
    /// Extra random pause between platforms
    pub between_platforms_jitter_secs: u64,
    /// Base pause between outreach batches
    pub email_batch_gap_secs: u64,
    /// Extra random pause between outreach batches
    pub email_batch_jitter_secs: u64,
    /// Fixed RNG seed for reproducible pacing
    pub seed: Option<u64>,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_secs: 60,
            max_secs: 180,
            between_platforms_secs: 300,
            between_platforms_jitter_secs: 60,
            email_batch_gap_secs: 3 * 60 * 60,
            email_batch_jitter_secs: 10 * 60,
            seed: None,
        }
    }
}

impl DelayConfig {
    /// All delays zero; used by tests and dry runs that should not wait.
    #[must_use]
    pub fn none() -> Self {
        Self {
            min_secs: 0,
            max_secs: 0,
            between_platforms_secs: 0,
            between_platforms_jitter_secs: 0,
            email_batch_gap_secs: 0,
            email_batch_jitter_secs: 0,
            seed: Some(0),
        }
    }
}

/// The platform healers are invited to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformProfile {
    /// Display name
    pub name: String,
    /// Home page
    pub url: String,
    /// Registration page
    pub signup_url: String,
    /// Reply-to contact address
    pub contact_email: String,
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self {
            name: "Common Soul".to_string(),
            url: "https://thecommonsoul.com".to_string(),
            signup_url: "https://thecommonsoul.com/register".to_string(),
            contact_email: "hello@thecommonsoul.com".to_string(),
        }
    }
}

/// SMTP connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// Relay host
    pub host: String,
    /// Relay port (STARTTLS)
    pub port: u16,
    /// Login user, also the sender address when none is configured
    pub username: Option<String>,
    /// Login password (environment only, never written to disk)
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
        }
    }
}

impl SmtpSettings {
    /// Whether both user and password are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.username) && present(&self.password)
    }
}

/// Outreach settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    /// Emails per batch
    pub batch_size: usize,
    /// Configured daily cap
    pub daily_limit: u32,
    /// Confidence floor for eligibility
    pub min_confidence: f64,
    /// Sender display name
    pub from_name: String,
    /// Sender address (defaults to the SMTP user)
    pub from_address: Option<String>,
    /// Platform details used in templates
    pub platform: PlatformProfile,
    /// SMTP relay
    pub smtp: SmtpSettings,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            daily_limit: 25,
            min_confidence: 0.6,
            from_name: "Common Soul Team".to_string(),
            from_address: None,
            platform: PlatformProfile::default(),
            smtp: SmtpSettings::default(),
        }
    }
}

impl OutreachConfig {
    /// Sender address: the configured one, else the SMTP user.
    #[must_use]
    pub fn sender_address(&self) -> Option<&str> {
        self.from_address
            .as_deref()
            .or(self.smtp.username.as_deref())
    }
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output directory
    pub dir: PathBuf,
    /// `xlsx` or `csv`
    pub default_format: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("Discovery Results/exports"),
            default_format: "xlsx".to_string(),
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1366,
            window_height: 768,
            navigation_timeout_secs: 30,
        }
    }
}

/// Discovery source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Hashtags the social source walks
    pub hashtags: Vec<String>,
    /// Profiles opened per hashtag
    pub profiles_per_hashtag: usize,
    /// Smallest follower count worth contacting
    pub min_followers: u64,
    /// Largest follower count worth contacting
    pub max_followers: u64,
    /// Social site base URL
    pub social_base_url: String,
    /// HTTP request timeout in seconds
    pub http_timeout_secs: u64,
    /// User agent for plain HTTP fetches
    pub user_agent: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            hashtags: [
                "reikihealer",
                "crystalhealing",
                "energyhealer",
                "spiritualguide",
                "chakrahealing",
                "soundtherapy",
                "holistichealer",
                "meditationteacher",
                "spiritualcoach",
                "lightworker",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            profiles_per_hashtag: 3,
            min_followers: 100,
            max_followers: 50_000,
            social_base_url: "https://www.instagram.com".to_string(),
            http_timeout_secs: 20,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}
