//! File encodings. Both write the same columns in the same order.

use crate::error::{ExportError, Result};
use crate::row::{ExportRow, Priority, COLUMNS};
use crate::summary::ExportSummary;
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Primary sheet name.
pub const HEALERS_SHEET: &str = "Healers";
/// Summary sheet name.
pub const SUMMARY_SHEET: &str = "Summary";

const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 50;

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Spreadsheet with `Healers` and `Summary` sheets
    Xlsx,
    /// Delimited text plus a `_summary.csv` companion
    Csv,
}

impl ExportFormat {
    /// File extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Write `rows` and their summary to `path`.
///
/// Returns the companion summary file, if the format has one.
pub fn write_export(
    format: ExportFormat,
    path: &Path,
    rows: &[ExportRow],
    generated: NaiveDateTime,
) -> Result<Option<PathBuf>> {
    let summary = ExportSummary::from_rows(rows).rows(generated);
    match format {
        ExportFormat::Xlsx => {
            write_xlsx(path, rows, &summary)?;
            Ok(None)
        }
        ExportFormat::Csv => {
            write_csv(path, rows)?;
            let summary_path = summary_path_for(path);
            write_summary_csv(&summary_path, &summary)?;
            Ok(Some(summary_path))
        }
    }
}

/// `name.csv` becomes `name_summary.csv`.
#[must_use]
pub fn summary_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_summary.csv"))
}

fn write_csv(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row.values())?;
    }
    writer.flush()?;
    Ok(())
}

fn write_summary_csv(path: &Path, summary: &[(String, String)]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Metric", "Value"])?;
    for (metric, value) in summary {
        writer.write_record([metric, value])?;
    }
    writer.flush()?;
    Ok(())
}

fn column_widths(rows: &[ExportRow]) -> Vec<usize> {
    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (width, value) in widths.iter_mut().zip(row.values()) {
            *width = (*width).max(value.chars().count());
        }
    }
    widths
        .into_iter()
        .map(|w| w.clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH))
        .collect()
}

fn write_xlsx(path: &Path, rows: &[ExportRow], summary: &[(String, String)]) -> Result<()> {
    let header = Format::new().set_bold();
    let high_priority = Format::new().set_background_color(Color::RGB(0x00E2_EFDA));

    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(HEALERS_SHEET)?;
    write_header(sheet, &COLUMNS, &header)?;
    for (i, row) in rows.iter().enumerate() {
        let r = sheet_row(i + 1)?;
        for (c, value) in row.values().iter().enumerate() {
            let c = sheet_col(c)?;
            if row.priority == Priority::High {
                sheet.write_string_with_format(r, c, *value, &high_priority)?;
            } else {
                sheet.write_string(r, c, *value)?;
            }
        }
    }
    for (c, width) in column_widths(rows).into_iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let width = width as f64;
        sheet.set_column_width(sheet_col(c)?, width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name(SUMMARY_SHEET)?;
    write_header(sheet, &["Metric", "Value"], &header)?;
    for (i, (metric, value)) in summary.iter().enumerate() {
        let r = sheet_row(i + 1)?;
        sheet.write_string(r, 0, metric)?;
        sheet.write_string(r, 1, value)?;
    }
    sheet.set_column_width(0, 28)?;
    sheet.set_column_width(1, 18)?;

    workbook.save(path)?;
    Ok(())
}

fn write_header(sheet: &mut Worksheet, names: &[&str], format: &Format) -> Result<()> {
    for (c, name) in names.iter().enumerate() {
        sheet.write_string_with_format(0, sheet_col(c)?, *name, format)?;
    }
    Ok(())
}

fn sheet_row(i: usize) -> Result<u32> {
    u32::try_from(i).map_err(|_| ExportError::OutOfRange(format!("row {i}")))
}

fn sheet_col(i: usize) -> Result<u16> {
    u16::try_from(i).map_err(|_| ExportError::OutOfRange(format!("column {i}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use healer_core::HealerCandidate;
    use tempfile::TempDir;

    fn generated() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 3, 3)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .expect("valid datetime")
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("XLSX".parse::<ExportFormat>().expect("xlsx"), ExportFormat::Xlsx);
        assert_eq!(" csv ".parse::<ExportFormat>().expect("csv"), ExportFormat::Csv);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(f)) if f == "pdf"
        ));
    }

    #[test]
    fn test_csv_with_summary() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("healer-contacts_test.csv");
        let mut healer = HealerCandidate::new("Luna, Reiki", "psychology_today");
        healer.email = Some("luna@lunahealing.com".to_string());
        let rows = vec![ExportRow::from_healer(&healer)];

        let summary = write_export(ExportFormat::Csv, &path, &rows, generated())
            .expect("write csv")
            .expect("summary path");
        assert_eq!(summary, dir.path().join("healer-contacts_test_summary.csv"));

        let mut reader = csv::Reader::from_path(&path).expect("read back");
        let headers = reader.headers().expect("headers").clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS.to_vec());
        let records: Vec<csv::StringRecord> = reader
            .records()
            .collect::<std::result::Result<_, _>>()
            .expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "Luna, Reiki");
        assert_eq!(&records[0][1], "luna@lunahealing.com");

        let summary_text = std::fs::read_to_string(summary).expect("read summary");
        assert!(summary_text.starts_with("Metric,Value"));
        assert!(summary_text.contains("Total Healers,1"));
    }

    #[test]
    fn test_empty_csv_is_header_only() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("empty.csv");
        write_export(ExportFormat::Csv, &path, &[], generated()).expect("write csv");

        let text = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Full_Name,Email,Phone"));
    }

    #[test]
    fn test_xlsx_is_written() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("healers.xlsx");
        let mut healer = HealerCandidate::new("Sage", "instagram");
        healer.bio = Some("x".repeat(80));
        let rows = vec![ExportRow::from_healer(&healer)];

        let companion =
            write_export(ExportFormat::Xlsx, &path, &rows, generated()).expect("write xlsx");
        assert!(companion.is_none());
        let bytes = std::fs::read(&path).expect("read back");
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_column_widths_are_clamped() {
        let mut healer = HealerCandidate::new("Al", "directory");
        healer.bio = Some("y".repeat(150));
        let widths = column_widths(&[ExportRow::from_healer(&healer)]);
        assert_eq!(widths.len(), COLUMNS.len());
        assert_eq!(widths[0], 10);
        assert_eq!(widths[7], 50);
        assert_eq!(widths[17], "Best_Contact_Method".len());
    }
}
