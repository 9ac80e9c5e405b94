//! Aggregate export: one CSV row per record collected during the run.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::declaratii::AggregateRecord;
use crate::error::ScraperError;

const HEADER: &[&str] = &[
    "search_query",
    "subject_name",
    "institution",
    "position",
    "city",
    "county",
    "declaration_date",
    "declaration_type",
    "has_download",
    "saved_filename",
    "download_status",
];

/// Write every record to `path` as CSV. An existing file from a prior run
/// is left alone; the export then goes to a timestamped variant instead.
/// Returns the path actually written.
pub fn export_records(
    records: &[AggregateRecord],
    path: impl AsRef<Path>,
) -> Result<PathBuf, ScraperError> {
    let target = resolve_export_path(path.as_ref());

    let mut writer = csv::Writer::from_path(&target)
        .map_err(|e| ScraperError::Export(format!("create {:?}: {}", target, e)))?;

    writer
        .write_record(HEADER)
        .map_err(|e| ScraperError::Export(e.to_string()))?;

    for record in records {
        let has_download = record.row.has_download.to_string();
        let status = record.outcome.status.to_string();
        writer
            .write_record([
                record.query.as_str(),
                record.row.subject_name.as_str(),
                record.row.institution.as_str(),
                record.row.position.as_str(),
                record.row.city.as_str(),
                record.row.county.as_str(),
                record.row.declaration_date.as_str(),
                record.row.declaration_type.as_str(),
                has_download.as_str(),
                record.outcome.saved_filename_marker(),
                status.as_str(),
            ])
            .map_err(|e| ScraperError::Export(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| ScraperError::Export(e.to_string()))?;

    info!("exported {} records to {:?}", records.len(), target);
    Ok(target)
}

fn resolve_export_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    variant_with_timestamp(path, &stamp)
}

fn variant_with_timestamp(path: &Path, stamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    };
    path.with_file_name(name)
}
