//! `dataset_summary.csv` generation for a run directory

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::errors::CaptureError;
use crate::fs::{layout, reader};
use crate::model::CaptureRecord;

pub const SUMMARY_HEADER: [&str; 7] = ["step", "action", "status", "file_name", "url", "title", "timestamp"];

/// Rebuild the summary from the record files on disk, ordered by step.
///
/// Unreadable record files are skipped with a warning. The header is written
/// even when the run has no records.
pub fn generate_summary(run_dir: &Path) -> Result<PathBuf, CaptureError> {
    let mut records = Vec::new();
    for path in reader::record_files(run_dir)? {
        match reader::read_record(&path) {
            Ok(record) => records.push(record),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable capture record"),
        }
    }
    write_summary(run_dir, records)
}

pub(crate) fn write_summary(
    run_dir: &Path,
    mut records: Vec<CaptureRecord>,
) -> Result<PathBuf, CaptureError> {
    records.sort_by(|a, b| a.step.cmp(&b.step).then(a.timestamp.cmp(&b.timestamp)));

    let path = layout::summary_path(run_dir);
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(SUMMARY_HEADER)?;
    for record in &records {
        let file_name = record
            .screenshot_path
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer.write_record([
            record.step.to_string(),
            record.action.clone(),
            record.status.to_string(),
            file_name,
            record.url.clone(),
            record.title.clone(),
            record.timestamp.to_rfc3339(),
        ])?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = records.len(), "wrote dataset summary");
    Ok(path)
}
