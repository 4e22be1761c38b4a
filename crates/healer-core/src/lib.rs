//! Healer Core - Foundation crate for the healer search pipeline.
//!
//! This crate provides shared types, error handling, configuration management,
//! the settings service and the storage seams that every other crate depends on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - `HealerCandidate`, `HealerStatus`, `Confidence` and friends
//! - [`store`] - Async storage traits plus an in-memory implementation
//! - [`settings`] - Typed settings service (ramp week, weekend mode, emergency stop)
//! - [`fetch`] - Page fetching seam
//! - [`taxonomy`] - Specialty and qualification vocabulary
//!
//! # Example
//!
//! ```rust
//! use healer_core::{AppConfig, Confidence, ConfidenceScale};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.outreach.batch_size, 3);
//!
//! let c = Confidence::from_scale(80.0, ConfidenceScale::Percent);
//! assert_eq!(c.percent(), 80);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod settings;
pub mod store;
pub mod taxonomy;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DelayConfig, DiscoveryConfig, ExportConfig, GeneralConfig,
    OutreachConfig, PipelineConfig, PlatformProfile, PlatformQuota, ProgressiveConfig,
    RateLimitConfig, SmtpSettings, WeekendConfig,
};
pub use error::{ConfigError, ConfigResult, HealerError, Result};
pub use fetch::{PageFetcher, StaticFetcher};
pub use settings::{EmergencyStop, Settings};
pub use store::{ActionCount, CounterStore, HealerStats, HealerStore, MemoryStore, SettingsStore};
pub use types::{
    CampaignRecord, Confidence, ConfidenceScale, DeliveryStatus, HealerCandidate, HealerFilter,
    HealerStatus, NewCampaign,
};
