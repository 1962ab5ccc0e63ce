use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

const MAX_SLUG_LEN: usize = 60;

/// `<dataset>/<app>/run_<YYYYmmdd_HHMMSS>`
pub fn run_dir(dataset: &Path, app: &str, started: DateTime<Local>) -> PathBuf {
    let mut path = dataset.to_path_buf();
    path.push(slugify(app));
    path.push(format!("run_{}", started.format("%Y%m%d_%H%M%S")));
    path
}

/// `base` for the first attempt, then `base_2`, `base_3`, ...
pub fn numbered_run_dir(base: &Path, attempt: u32) -> PathBuf {
    if attempt == 0 {
        return base.to_path_buf();
    }
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_{}", attempt + 1));
    PathBuf::from(name)
}

/// `<NN>_<slug>`; the same step and label always map to the same stem
pub fn capture_stem(step: usize, label: &str) -> String {
    format!("{step:02}_{}", slugify(label))
}

pub fn record_path(run_dir: &Path, stem: &str) -> PathBuf {
    run_dir.join(format!("{stem}.json"))
}

pub fn screenshot_path(run_dir: &Path, stem: &str) -> PathBuf {
    run_dir.join(format!("{stem}.png"))
}

pub fn summary_path(run_dir: &Path) -> PathBuf {
    run_dir.join("dataset_summary.csv")
}

/// File-name safe form of a label: lower-case ASCII alphanumerics, `-` and
/// single `_` separators.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '-' {
            c.to_ascii_lowercase()
        } else {
            '_'
        };
        if mapped == '_' && (slug.is_empty() || slug.ends_with('_')) {
            continue;
        }
        slug.push(mapped);
    }
    let slug: String = slug.trim_end_matches('_').chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "step".to_string()
    } else {
        slug
    }
}
