//! Healer Pipeline - end-to-end run orchestration.
//!
//! Sequences the phases of a daily run over shared components: discovery
//! sources find candidates, the contact extractor enriches them, the store
//! keeps them, the outreach engine contacts the best of them and the exporter
//! writes a mail-merge list.
//!
//! # Features
//!
//! - Emergency stop and weekend blackout checked before any external action
//! - Phase failures caught into the run report so later phases still run
//! - Block and ban signals latch the emergency stop and end the run
//! - Sources always closed, including after a failure
//!
//! # Example
//!
//! ```rust,ignore
//! use healer_pipeline::Pipeline;
//! use std::sync::Arc;
//!
//! let mut pipeline = Pipeline::from_config(config, Arc::new(database)).await?;
//! let report = pipeline.run_full().await?;
//! pipeline.cleanup().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod pipeline;
pub mod report;
pub mod sources;

// Re-export commonly used types
pub use error::{is_emergency_message, PipelineError, Result};
pub use pipeline::{Pipeline, PipelineStatus};
pub use report::{
    DiscoveryReport, EnrichmentReport, OutreachReport, PhaseError, RunOutcome, RunReport,
    SourceReport,
};
pub use sources::{build_sources, directory_definitions, LazySocialSource};
