use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Ok,
    Failed,
}

impl CaptureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStatus::Ok => "ok",
            CaptureStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the surface right after one executed step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// 1-based step number
    pub step: usize,
    /// Action label the capture was taken for
    pub action: String,
    pub status: CaptureStatus,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub title: String,
    pub structural_fingerprint: String,
    /// 64-bit DCT hash of the screenshot, hex encoded
    pub perceptual_fingerprint: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

impl CaptureRecord {
    /// File stem shared by the record and its screenshot
    pub fn stem(&self) -> String {
        crate::fs::layout::capture_stem(self.step, &self.action)
    }
}
