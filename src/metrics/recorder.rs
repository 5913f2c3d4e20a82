//! Metrics recorder for upload and download operations

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    // Upload counters
    describe_counter!(
        "treedrop_batches_uploaded_total",
        "Total number of batches acknowledged by the server"
    );
    describe_counter!(
        "treedrop_batches_failed_total",
        "Total number of batches rejected or lost"
    );
    describe_counter!("treedrop_bytes_uploaded_total", "Total bytes uploaded");
    describe_counter!(
        "treedrop_uploads_started_total",
        "Total number of submissions started"
    );
    describe_counter!(
        "treedrop_uploads_completed_total",
        "Total number of submissions completed successfully"
    );
    describe_counter!(
        "treedrop_uploads_failed_total",
        "Total number of submissions that failed"
    );
    describe_counter!(
        "treedrop_completions_sent_total",
        "Total number of completion notifications sent"
    );

    // Download counters
    describe_counter!("treedrop_bytes_downloaded_total", "Total bytes downloaded");
    describe_counter!(
        "treedrop_downloads_completed_total",
        "Total number of archives saved"
    );
    describe_counter!(
        "treedrop_downloads_failed_total",
        "Total number of downloads that failed"
    );

    // Gauges
    describe_gauge!(
        "treedrop_active_uploads",
        "Number of submissions currently in flight"
    );

    // Histograms
    describe_histogram!(
        "treedrop_upload_duration_seconds",
        "Total duration of a submission"
    );
    describe_histogram!("treedrop_batch_size_files", "Files per uploaded batch");
}

// ============== Batch Operations ==============

/// Record a batch acknowledged by the server
pub fn record_batch_uploaded(batch: u32, files: usize, bytes: u64) {
    counter!("treedrop_batches_uploaded_total").increment(1);
    counter!("treedrop_bytes_uploaded_total").increment(bytes);
    histogram!("treedrop_batch_size_files").record(files as f64);
    tracing::trace!(batch, files, bytes, "Batch recorded");
}

/// Record a batch the server did not accept
pub fn record_batch_failed(batch: u32) {
    counter!("treedrop_batches_failed_total", "batch" => batch.to_string()).increment(1);
}

// ============== Submission Operations ==============

/// Record a submission starting
pub fn record_upload_started(mode: &str) {
    counter!("treedrop_uploads_started_total", "mode" => mode.to_string()).increment(1);
    gauge!("treedrop_active_uploads").increment(1.0);
}

/// Record a submission completing successfully
pub fn record_upload_complete(mode: &str, duration: Duration) {
    counter!("treedrop_uploads_completed_total", "mode" => mode.to_string()).increment(1);
    gauge!("treedrop_active_uploads").decrement(1.0);
    histogram!("treedrop_upload_duration_seconds").record(duration.as_secs_f64());
}

/// Record a submission failing
pub fn record_upload_failed(mode: &str, reason: &str) {
    counter!("treedrop_uploads_failed_total", "mode" => mode.to_string(), "reason" => reason.to_string()).increment(1);
    gauge!("treedrop_active_uploads").decrement(1.0);
}

/// Record the completion notification going out
pub fn record_completion_sent() {
    counter!("treedrop_completions_sent_total").increment(1);
}

// ============== Download Operations ==============

pub fn record_download_bytes(bytes: u64) {
    counter!("treedrop_bytes_downloaded_total").increment(bytes);
}

pub fn record_download_complete() {
    counter!("treedrop_downloads_completed_total").increment(1);
}

pub fn record_download_failed(reason: &str) {
    counter!("treedrop_downloads_failed_total", "reason" => reason.to_string()).increment(1);
}

/// Times one submission and records its outcome
pub struct SubmissionMetrics {
    mode: &'static str,
    start_time: Instant,
}

impl SubmissionMetrics {
    /// Start tracking a submission
    pub fn start(mode: &'static str) -> Self {
        record_upload_started(mode);

        Self {
            mode,
            start_time: Instant::now(),
        }
    }

    /// Mark submission as complete
    pub fn complete(self) {
        record_upload_complete(self.mode, self.start_time.elapsed());
    }

    /// Mark submission as failed
    pub fn fail(self, reason: &str) {
        record_upload_failed(self.mode, reason);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
