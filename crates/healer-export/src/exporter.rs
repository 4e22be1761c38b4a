//! Reads the healer set from the store and writes mail-merge files.

use crate::error::{ExportError, Result};
use crate::row::ExportRow;
use crate::writer::{write_export, ExportFormat};
use chrono::{Local, NaiveDateTime};
use healer_core::{ExportConfig, HealerFilter, HealerStatus, HealerStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

const FILE_PREFIX: &str = "healer-contacts";

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    /// The primary file
    pub file_path: PathBuf,
    /// Rows written, equal to the number of healers the filter matched
    pub record_count: usize,
    /// Encoding used
    pub format: ExportFormat,
    /// Companion summary file, for csv
    pub summary_path: Option<PathBuf>,
}

/// An export already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Full path
    pub path: PathBuf,
    /// Encoding, from the extension
    pub format: ExportFormat,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

/// File name for an export taken at `at` with `filter`.
///
/// `healer-contacts_{YYYY-MM-DD_HH-MM-SS}{_status}{_platform}{_confNN}.{ext}`
#[must_use]
pub fn export_filename(filter: &HealerFilter, format: ExportFormat, at: NaiveDateTime) -> String {
    let mut name = format!("{FILE_PREFIX}_{}", at.format("%Y-%m-%d_%H-%M-%S"));
    if let Some(status) = filter.status {
        name.push('_');
        name.push_str(status.as_str());
    }
    if let Some(platform) = &filter.source_platform {
        name.push('_');
        name.push_str(platform);
    }
    if let Some(min) = filter.min_confidence.filter(|c| c.value() > 0.0) {
        name.push_str(&format!("_conf{}", min.percent()));
    }
    name.push('.');
    name.push_str(format.extension());
    name
}

/// Writes exports into the configured directory.
pub struct Exporter {
    store: Arc<dyn HealerStore>,
    dir: PathBuf,
    default_format: ExportFormat,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("dir", &self.dir)
            .field("default_format", &self.default_format)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    /// Create an exporter from the `[export]` config.
    pub fn new(store: Arc<dyn HealerStore>, config: &ExportConfig) -> Result<Self> {
        Ok(Self {
            store,
            dir: config.dir.clone(),
            default_format: config.default_format.parse()?,
        })
    }

    /// Export directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Export healers matching `filter`, in `format` or the configured default.
    ///
    /// No matching healers still produces a header-only file.
    pub async fn export_healers(
        &self,
        filter: &HealerFilter,
        format: Option<ExportFormat>,
    ) -> Result<ExportResult> {
        self.export_at(filter, format, Local::now().naive_local())
            .await
    }

    async fn export_at(
        &self,
        filter: &HealerFilter,
        format: Option<ExportFormat>,
        at: NaiveDateTime,
    ) -> Result<ExportResult> {
        let format = format.unwrap_or(self.default_format);
        info!(format = %format, filter = ?filter, "starting export");

        let healers = self.store.get_healers(filter).await?;
        if healers.is_empty() {
            warn!(filter = ?filter, "no healers match export filter, writing headers only");
        }
        let rows: Vec<ExportRow> = healers.iter().map(ExportRow::from_healer).collect();
        let record_count = rows.len();

        let dir = self.dir.clone();
        let file_path = self.dir.join(export_filename(filter, format, at));
        let target = file_path.clone();
        // Spreadsheet and csv writers are synchronous
        let summary_path = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            write_export(format, &target, &rows, at)
        })
        .await
        .map_err(|e| ExportError::Task(e.to_string()))??;

        info!(
            format = %format,
            records = record_count,
            path = %file_path.display(),
            "export generated"
        );
        Ok(ExportResult {
            file_path,
            record_count,
            format,
            summary_path,
        })
    }

    /// The mail-merge list for an email campaign: discovered healers at
    /// confidence 0.6 or better, as csv.
    pub async fn export_for_email_campaign(&self) -> Result<ExportResult> {
        let filter = HealerFilter::default()
            .with_status(HealerStatus::Discovered)
            .with_min_confidence(0.6);
        self.export_healers(&filter, Some(ExportFormat::Csv)).await
    }

    /// Exports in the directory, newest first. Summary companions are left out.
    pub fn list_exports(&self) -> Result<Vec<ExportFile>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(format) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(|e| e.parse::<ExportFormat>().ok())
            else {
                continue;
            };
            let is_summary = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.ends_with("_summary"));
            if is_summary {
                continue;
            }
            let metadata = std::fs::metadata(&path)?;
            files.push(ExportFile {
                path,
                format,
                size: metadata.len(),
                modified: metadata.modified()?,
            });
        }
        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
        Ok(files)
    }
}
