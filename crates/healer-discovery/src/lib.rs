//! Healer Discovery - Finding healing practitioners on listing directories
//! and social platforms.
//!
//! # Architecture
//!
//! - **Sources** ([`source`]): The [`DiscoverySource`] trait every source implements
//! - **Definition Types** ([`definition`]): TOML-described listing directories
//! - **Loader** ([`loader`]): Definition loading, plus the built-in Psychology Today definition
//! - **Directories** ([`directory`]): [`DirectorySource`], one per definition
//! - **Social** ([`social`]): [`SocialProfileSource`], hashtag-driven profile discovery
//! - **Errors** ([`error`]): Discovery-specific error types
//!
//! # Example
//!
//! ```rust
//! use healer_discovery::DirectoryLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let builtin = DirectoryLoader::builtin()?;
//! let pt = &builtin[0];
//! assert_eq!(pt.platform(), "psychology_today");
//! println!("{} searches", pt.search_pairs().len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod definition;
pub mod directory;
pub mod error;
pub mod loader;
pub mod social;
pub mod source;

// Re-export commonly used types
pub use definition::{DirectoryDefinition, DirectoryMetadata, ListingSelectors};
pub use directory::{DirectorySource, Listing};
pub use error::{DiscoveryError, Result};
pub use loader::DirectoryLoader;
pub use social::{SocialProfile, SocialProfileSource};
pub use source::{block_marker, DiscoverySource};
