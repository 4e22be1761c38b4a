//! Healer Outreach - Rate-governed email outreach to discovered healers.
//!
//! # Architecture
//!
//! - **Templates** ([`templates`]): Built-in HTML templates, merge fields and subject variants
//! - **Transport** ([`transport`]): The [`MailTransport`] seam, SMTP over lettre and an in-memory recorder
//! - **Engine** ([`engine`]): [`OutreachEngine`], selection, gated sends, batches and the daily schedule
//! - **Errors** ([`error`]): Outreach-specific error types
//!
//! # Example
//!
//! ```rust
//! use healer_outreach::{TemplateLibrary, INITIAL_OUTREACH};
//!
//! let library = TemplateLibrary::builtin();
//! assert!(library.get(INITIAL_OUTREACH).is_some());
//! assert!(library.names().any(|name| name == "reiki_master"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod engine;
pub mod error;
pub mod templates;
pub mod transport;

// Re-export commonly used types
pub use engine::{
    BatchReport, BatchSummary, DailyOutreach, OutreachCriteria, OutreachEngine, SendOutcome,
};
pub use error::{OutreachError, Result};
pub use templates::{
    html_to_text, render, subject_variants, MergeFields, Placeholder, TemplateLibrary,
    INITIAL_OUTREACH,
};
pub use transport::{MailTransport, OutgoingEmail, RecordingTransport, SendReceipt, SmtpTransport};
