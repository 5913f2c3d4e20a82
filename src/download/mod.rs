pub mod error;
pub mod tracker;
pub mod types;

pub use error::{DownloadError, DownloadResult};
pub use tracker::DownloadTracker;
pub use types::{DownloadProgress, DownloadState};
