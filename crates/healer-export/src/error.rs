//! Error types for exports.

use healer_core::HealerError;
use thiserror::Error;

/// Errors raised while exporting healers.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Format other than `xlsx` or `csv`
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Row or column index past what the spreadsheet can hold
    #[error("spreadsheet {0} out of range")]
    OutOfRange(String),

    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writer failure
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Store read failure
    #[error(transparent)]
    Core(#[from] HealerError),

    /// I/O error creating the export directory or files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking writer task panicked or was cancelled
    #[error("export task failed: {0}")]
    Task(String),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
