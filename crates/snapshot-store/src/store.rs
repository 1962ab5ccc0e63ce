use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use surface_driver::SurfaceDriver;
use tracing::{debug, info, warn};

use crate::errors::CaptureError;
use crate::fs::{layout, writer};
use crate::hash::structural_fingerprint;
use crate::model::{CaptureRecord, CaptureStatus};
use crate::phash::phash_bytes;
use crate::summary;

/// Append-only capture log of one run.
///
/// Records never feed back into execution; the store only observes the
/// surface and writes files.
#[derive(Debug)]
pub struct CaptureStore {
    app: String,
    run_dir: PathBuf,
    records: Vec<CaptureRecord>,
}

impl CaptureStore {
    /// Create a fresh run directory under `<dataset>/<app>/`.
    ///
    /// Runs started within the same second get numbered directories instead
    /// of sharing one.
    pub fn create(dataset_dir: &Path, app: &str) -> Result<Self, CaptureError> {
        let base = layout::run_dir(dataset_dir, app, Local::now());
        if let Some(parent) = base.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut attempt = 0;
        let run_dir = loop {
            let candidate = layout::numbered_run_dir(&base, attempt);
            match std::fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err.into()),
            }
        };
        info!(app, run_dir = %run_dir.display(), "capture run directory ready");
        Ok(Self {
            app: app.to_string(),
            run_dir,
            records: Vec::new(),
        })
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn records(&self) -> &[CaptureRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CaptureRecord> {
        self.records
    }

    /// Snapshot the surface for `step` and persist the record.
    ///
    /// Surface read failures degrade to empty strings and a missing or
    /// undecodable screenshot leaves the screenshot fields empty; only a
    /// failed record write is an error. A repeated step and label overwrite
    /// the earlier record.
    pub async fn capture(
        &mut self,
        surface: &dyn SurfaceDriver,
        step: usize,
        label: &str,
        status: CaptureStatus,
    ) -> Result<CaptureRecord, CaptureError> {
        let stem = layout::capture_stem(step, label);
        let png = layout::screenshot_path(&self.run_dir, &stem);

        let (screenshot_path, perceptual_fingerprint) = if surface.screenshot(&png).await {
            match tokio::fs::read(&png).await {
                Ok(bytes) => match phash_bytes(&bytes) {
                    Ok(hash) => (Some(png), Some(hash)),
                    Err(err) => {
                        warn!(step, path = %png.display(), error = %err, "screenshot not decodable");
                        (None, None)
                    }
                },
                Err(err) => {
                    warn!(step, path = %png.display(), error = %err, "screenshot not readable");
                    (None, None)
                }
            }
        } else {
            debug!(step, "surface produced no screenshot");
            (None, None)
        };

        let page = surface.read_text().await.unwrap_or_else(|err| {
            warn!(step, error = %err, "page text unavailable");
            String::new()
        });
        let url = surface.current_url().await.unwrap_or_default();
        let title = surface.title().await.unwrap_or_default();

        let record = CaptureRecord {
            step,
            action: label.to_string(),
            status,
            timestamp: Utc::now(),
            url,
            title,
            structural_fingerprint: structural_fingerprint(&page),
            perceptual_fingerprint,
            screenshot_path,
        };

        let path = writer::write_record(&layout::record_path(&self.run_dir, &stem), &record)?;
        info!(step, label, status = %status, path = %path.display(), "captured state");

        match self.records.iter_mut().find(|existing| existing.stem() == stem) {
            Some(existing) => *existing = record.clone(),
            None => self.records.push(record.clone()),
        }
        Ok(record)
    }

    /// Store an auxiliary file (plan revisions) next to the records
    pub fn write_artifact(&self, name: &str, data: &[u8]) -> Result<PathBuf, CaptureError> {
        Ok(writer::write_atomic(self.run_dir.join(name), data)?)
    }

    /// Write `dataset_summary.csv` for the records captured so far.
    pub fn write_summary(&self) -> Result<PathBuf, CaptureError> {
        summary::write_summary(&self.run_dir, self.records.clone())
    }
}
