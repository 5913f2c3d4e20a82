use crate::batch::{Batch, BatchPartitioner, PendingFile};
use crate::config::ClientConfig;
use crate::metrics::{self, SubmissionMetrics};
use crate::transport::{BatchUploadRequest, FlatUploadRequest, ProgressCallback, TransferService};
use crate::upload::error::{UploadError, UploadResult};
use crate::upload::notifier::CompletionNotifier;
use crate::upload::state_machine::UploadStateMachine;
use crate::upload::types::{
    DeliveryMode, SubmitOptions, UploadEvent, UploadMode, UploadOutcome, UploadProgress,
    UploadSession,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Most files a single flat upload may carry
pub const DEFAULT_FLAT_FILE_CAP: usize = 1500;

const SUCCESS_MESSAGE: &str = "Files uploaded successfully";

/// Drives one submission at a time through the transfer service.
///
/// Directory selections go out as sequential batches sharing the identifier
/// returned by batch 1, followed by a single completion call. Flat selections
/// go out as one request.
pub struct UploadSequencer<S> {
    service: Arc<S>,
    partitioner: BatchPartitioner,
    flat_file_cap: usize,
    state_machine: UploadStateMachine,
    notifier: CompletionNotifier<S>,
}

impl<S: TransferService> UploadSequencer<S> {
    pub fn new(service: Arc<S>, partitioner: BatchPartitioner, flat_file_cap: usize) -> Self {
        Self {
            notifier: CompletionNotifier::new(service.clone()),
            service,
            partitioner,
            flat_file_cap,
            state_machine: UploadStateMachine::new(),
        }
    }

    pub fn from_config(service: Arc<S>, config: &ClientConfig) -> UploadResult<Self> {
        let partitioner = BatchPartitioner::new(config.batch_size)?;
        Ok(Self::new(service, partitioner, config.flat_file_cap))
    }

    pub fn partitioner(&self) -> &BatchPartitioner {
        &self.partitioner
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> UploadSession {
        self.state_machine.snapshot()
    }

    /// Progress snapshots published on every visible change (can only be taken once)
    pub fn take_progress_receiver(&self) -> Option<mpsc::UnboundedReceiver<UploadProgress>> {
        self.state_machine.take_receiver()
    }

    /// Drop a finished session
    pub fn reset(&self) -> UploadResult<()> {
        self.state_machine.transition(UploadEvent::Reset)?;
        Ok(())
    }

    /// Checks that run before any request is sent
    pub fn validate(&self, files: &[PendingFile], options: &SubmitOptions) -> UploadResult<()> {
        if files.is_empty() {
            return Err(UploadError::EmptySelection);
        }

        if options.delivery == DeliveryMode::Email && options.recipients.is_empty() {
            return Err(UploadError::MissingRecipients);
        }

        if options.mode == UploadMode::Files && files.len() > self.flat_file_cap {
            return Err(UploadError::TooManyFiles {
                count: files.len(),
                max: self.flat_file_cap,
            });
        }

        Ok(())
    }

    /// Validate and upload `files`
    pub async fn submit(
        &self,
        files: &[PendingFile],
        options: &SubmitOptions,
    ) -> UploadResult<UploadOutcome> {
        self.validate(files, options)?;

        match options.mode {
            UploadMode::Directory => {
                let batches = self.partitioner.partition(files);
                self.run_batches(&batches, options).await
            }
            UploadMode::Files => self.run_flat(files, options).await,
        }
    }

    async fn run_batches(
        &self,
        batches: &[Batch<'_>],
        options: &SubmitOptions,
    ) -> UploadResult<UploadOutcome> {
        if batches.is_empty() {
            tracing::debug!("Nothing to upload");
            return Ok(UploadOutcome {
                session_id: String::new(),
                transfer_dir: None,
                transfer_dir_url: None,
                share_link: None,
                batches: 0,
                files: 0,
                progress_percent: 0.0,
                message: String::new(),
            });
        }

        let total_batches = batches.len() as u32;
        self.state_machine.transition(UploadEvent::Start {
            total_batches,
            mode: UploadMode::Directory,
            delivery: options.delivery,
            recipients: options.recipients.clone(),
        })?;
        self.notifier.arm();

        let submission = SubmissionMetrics::start(UploadMode::Directory.as_str());
        let session_id = self.state_machine.snapshot().session_id;
        tracing::info!(
            session_id = %session_id,
            total_batches,
            files = batches.iter().map(Batch::len).sum::<usize>(),
            "Starting directory upload"
        );

        let recipients = options.upload_recipients();
        let mut transfer_dir: Option<String> = None;
        let mut transfer_dir_url: Option<String> = None;

        for batch in batches {
            tracing::info!(
                session_id = %session_id,
                batch = batch.number,
                total_batches,
                files = batch.len(),
                "Dispatching batch"
            );

            let request = BatchUploadRequest {
                files: batch.files.to_vec(),
                relative_paths: batch.relative_paths(),
                recipients: recipients.clone(),
                transfer_dir: transfer_dir.clone(),
            };

            let receipt = match self
                .service
                .upload(request, self.batch_progress(batch.number))
                .await
            {
                Ok(receipt) => receipt,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        batch = batch.number,
                        "Batch upload failed: {}",
                        e
                    );
                    self.fail_batch(batch.number, e.to_string());
                    submission.fail("batch");
                    return Err(UploadError::BatchFailed {
                        batch: batch.number,
                        source: e,
                    });
                }
            };

            if batch.number == 1 {
                match receipt.transfer_dir() {
                    Some(dir) => transfer_dir = Some(dir.to_string()),
                    None => {
                        tracing::warn!(
                            session_id = %session_id,
                            url = %receipt.transfer_dir_url,
                            "First batch returned no transfer directory"
                        );
                        self.fail_batch(batch.number, UploadError::MissingTransferDir.to_string());
                        submission.fail("transfer_dir");
                        return Err(UploadError::MissingTransferDir);
                    }
                }
            }
            transfer_dir_url = Some(receipt.transfer_dir_url);

            self.state_machine.transition(UploadEvent::BatchAcked {
                batch: batch.number,
                transfer_dir: transfer_dir.clone(),
            })?;
            metrics::record_batch_uploaded(batch.number, batch.len(), batch.total_bytes());
        }

        let session = self.state_machine.snapshot();
        match self.notifier.observe(&session).await {
            Ok(sent) => {
                if sent {
                    metrics::record_completion_sent();
                }
                self.state_machine.transition(UploadEvent::CompletionAcked)?;
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, "Completion failed: {}", e);
                self.state_machine
                    .transition(UploadEvent::CompletionFailed {
                        error: e.to_string(),
                    })?;
                submission.fail("completion");
                return Err(e);
            }
        }

        tracing::info!(
            session_id = %session_id,
            total_batches,
            elapsed_ms = submission.elapsed().as_millis() as u64,
            "Directory upload complete"
        );
        submission.complete();

        let session = self.state_machine.snapshot();
        Ok(UploadOutcome {
            session_id: session.session_id,
            share_link: share_link(options.delivery, &transfer_dir_url),
            transfer_dir: session.transfer_dir,
            transfer_dir_url,
            batches: total_batches,
            files: batches.iter().map(Batch::len).sum(),
            progress_percent: session.progress_percent,
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    async fn run_flat(
        &self,
        files: &[PendingFile],
        options: &SubmitOptions,
    ) -> UploadResult<UploadOutcome> {
        self.state_machine.transition(UploadEvent::Start {
            total_batches: 1,
            mode: UploadMode::Files,
            delivery: options.delivery,
            recipients: options.recipients.clone(),
        })?;

        let submission = SubmissionMetrics::start(UploadMode::Files.as_str());
        let session_id = self.state_machine.snapshot().session_id;
        tracing::info!(session_id = %session_id, files = files.len(), "Starting flat upload");

        let request = FlatUploadRequest {
            files: files.to_vec(),
            recipients: options.upload_recipients(),
        };

        let receipt = match self
            .service
            .upload_flat(request, self.batch_progress(1))
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(session_id = %session_id, "Flat upload failed: {}", e);
                self.fail_batch(1, e.to_string());
                submission.fail("batch");
                return Err(UploadError::BatchFailed {
                    batch: 1,
                    source: e,
                });
            }
        };

        self.state_machine.transition(UploadEvent::BatchAcked {
            batch: 1,
            transfer_dir: receipt.transfer_dir().map(str::to_string),
        })?;
        let bytes = files.iter().map(PendingFile::size).sum();
        metrics::record_batch_uploaded(1, files.len(), bytes);
        submission.complete();
        tracing::info!(session_id = %session_id, "Flat upload complete");

        let session = self.state_machine.snapshot();
        let transfer_dir_url = Some(receipt.transfer_dir_url);
        Ok(UploadOutcome {
            session_id: session.session_id,
            share_link: share_link(options.delivery, &transfer_dir_url),
            transfer_dir: session.transfer_dir,
            transfer_dir_url,
            batches: 1,
            files: files.len(),
            progress_percent: session.progress_percent,
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    /// Feed byte counts of `batch` into the state machine
    fn batch_progress(&self, batch: u32) -> ProgressCallback {
        let state_machine = self.state_machine.clone();
        Arc::new(move |acked, total| {
            if let Err(e) = state_machine.transition(UploadEvent::BatchProgress {
                batch,
                acked,
                total,
            }) {
                tracing::debug!(batch, "Dropped progress update: {}", e);
            }
        })
    }

    fn fail_batch(&self, batch: u32, error: String) {
        metrics::record_batch_failed(batch);
        if let Err(e) = self
            .state_machine
            .transition(UploadEvent::BatchFailed { batch, error })
        {
            tracing::warn!(batch, "Could not record batch failure: {}", e);
        }
    }
}

fn share_link(delivery: DeliveryMode, transfer_dir_url: &Option<String>) -> Option<String> {
    match delivery {
        DeliveryMode::Link => transfer_dir_url.clone(),
        DeliveryMode::Email => None,
    }
}
