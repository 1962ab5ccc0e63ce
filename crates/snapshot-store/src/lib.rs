//! Per-step state capture.
//!
//! Every executed step leaves a JSON record and, when the surface can take
//! one, a PNG screenshot in the run directory
//! `<dataset>/<app>/run_<YYYYmmdd_HHMMSS>/`. Records carry a blake3 structural
//! fingerprint of the serialized page and a DCT perceptual hash of the
//! screenshot. `dataset_summary.csv` tabulates a run.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod model;
pub mod phash;
pub mod store;
pub mod summary;

pub use errors::CaptureError;
pub use hash::structural_fingerprint;
pub use model::{CaptureRecord, CaptureStatus};
pub use phash::{hamming_distance, phash_bytes};
pub use store::CaptureStore;
pub use summary::{generate_summary, SUMMARY_HEADER};
