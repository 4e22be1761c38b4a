//! Controlled browser sessions for JavaScript-heavy pages.
//!
//! Provides a Chromium session with a randomized fingerprint that plugs
//! into discovery as a `PageFetcher`.

pub mod engine;
pub mod error;
pub mod fingerprint;

pub use engine::BrowserSession;
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
