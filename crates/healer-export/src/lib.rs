//! Healer Export - Mail-merge exports of the healer set.
//!
//! Every row carries the healer's contact fields under stable column names
//! plus three derived columns: `Outreach_Priority`, `Best_Contact_Method`
//! and `Outreach_Template`. Spreadsheet and delimited output share the same
//! columns so a mail-merge template works against either.
//!
//! # Architecture
//!
//! - **Rows** ([`row`]): [`ExportRow`] mapping, priority scoring and contact method
//! - **Summary** ([`summary`]): Counts by priority, contact method and specialty
//! - **Writers** ([`writer`]): `xlsx` via `rust_xlsxwriter`, `csv` via `csv`
//! - **Exporter** ([`exporter`]): [`Exporter`], store reads and file naming
//! - **Errors** ([`error`]): Export-specific error types
//!
//! # Example
//!
//! ```rust
//! use healer_core::HealerCandidate;
//! use healer_export::{ContactMethod, ExportRow, Priority};
//!
//! let mut healer = HealerCandidate::new("Healing Center", "psychology_today");
//! healer.email = Some("info@healingcenter.com".to_string());
//! let row = ExportRow::from_healer(&healer);
//! assert_eq!(row.best_contact_method, ContactMethod::Email);
//! assert_eq!(row.priority, Priority::Low);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod exporter;
pub mod row;
pub mod summary;
pub mod writer;

// Re-export commonly used types
pub use error::{ExportError, Result};
pub use exporter::{export_filename, ExportFile, ExportResult, Exporter};
pub use row::{priority_score, ContactMethod, ExportRow, Priority, COLUMNS};
pub use summary::ExportSummary;
pub use writer::{ExportFormat, HEALERS_SHEET, SUMMARY_SHEET};
