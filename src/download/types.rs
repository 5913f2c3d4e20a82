use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bytes received so far. `percent` is only known when the server announced a length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
    pub percent: Option<f32>,
}

impl DownloadProgress {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        let percent = total
            .filter(|total| *total > 0)
            .map(|total| (loaded.min(total) as f64 / total as f64 * 100.0) as f32);
        Self {
            loaded,
            total,
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadState {
    Idle,
    Downloading(DownloadProgress),
    Completed { path: PathBuf },
    Failed { error: String },
}

impl DownloadState {
    pub fn is_active(&self) -> bool {
        matches!(self, DownloadState::Downloading(_))
    }
}
