//! Metrics for the upload and download pipelines
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding application.
//!
//! Key metrics:
//! - Batches and bytes uploaded
//! - Submissions completed or failed, by mode
//! - Bytes downloaded

pub mod recorder;

pub use recorder::{
    init_metrics, record_batch_failed, record_batch_uploaded, record_completion_sent,
    record_download_bytes, record_download_complete, record_download_failed,
    record_upload_complete, record_upload_failed, record_upload_started, SubmissionMetrics,
};
