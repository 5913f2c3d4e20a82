use crate::batch::{PendingFile, Selection};
use crate::transport::TransferService;
use crate::upload::error::{UploadError, UploadResult};
use crate::upload::recipients::Recipients;
use crate::upload::sequencer::UploadSequencer;
use crate::upload::types::{DeliveryMode, SubmitOptions, UploadMode, UploadOutcome};

/// Upload screen state: what is selected, who receives it, and the last status
pub struct UploadController<S> {
    sequencer: UploadSequencer<S>,
    selection: Selection,
    recipients: Recipients,
    mode: UploadMode,
    delivery: DeliveryMode,
    message: Option<String>,
    share_link: Option<String>,
}

impl<S: TransferService> UploadController<S> {
    pub fn new(sequencer: UploadSequencer<S>) -> Self {
        Self {
            sequencer,
            selection: Selection::default(),
            recipients: Recipients::new(),
            mode: UploadMode::default(),
            delivery: DeliveryMode::default(),
            message: None,
            share_link: None,
        }
    }

    pub fn sequencer(&self) -> &UploadSequencer<S> {
        &self.sequencer
    }

    /// Replace the selection with freshly picked files
    pub fn select(&mut self, files: Vec<PendingFile>) {
        self.selection.replace(files);
        self.message = None;
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    /// Switching between directory and files mode discards the current selection
    pub fn set_mode(&mut self, mode: UploadMode) {
        if self.mode != mode {
            self.selection.clear();
            self.mode = mode;
        }
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    pub fn set_delivery(&mut self, delivery: DeliveryMode) {
        self.delivery = delivery;
        self.share_link = None;
    }

    pub fn recipients(&self) -> &Recipients {
        &self.recipients
    }

    /// Replace the pending recipient input; clears the status line
    pub fn set_recipient_input(&mut self, input: impl Into<String>) {
        self.recipients.set_input(input);
        self.message = None;
    }

    /// Commit the pending recipient input (blur or Enter)
    pub fn commit_recipient(&mut self) -> UploadResult<bool> {
        let result = self.recipients.commit();
        self.record_recipient_result(result)
    }

    /// Append an address directly, leaving the pending input alone
    pub fn add_recipient(&mut self, address: &str) -> UploadResult<bool> {
        let result = self.recipients.add(address);
        self.record_recipient_result(result)
    }

    pub fn remove_recipient(&mut self, index: usize) -> Option<String> {
        self.recipients.remove(index)
    }

    fn record_recipient_result(&mut self, result: UploadResult<bool>) -> UploadResult<bool> {
        match result {
            Ok(added) => {
                if added {
                    self.message = None;
                }
                Ok(added)
            }
            Err(e) => {
                self.message = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Status line: the most recent success, validation or failure text
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn share_link(&self) -> Option<&str> {
        self.share_link.as_deref()
    }

    /// Upload the current selection.
    ///
    /// On success the selection and recipients are cleared and the session is
    /// reset. On failure the selection stays so the user can submit again.
    pub async fn submit(&mut self) -> UploadResult<UploadOutcome> {
        let options = SubmitOptions {
            mode: self.mode,
            delivery: self.delivery,
            recipients: self.recipients.addresses().to_vec(),
        };

        match self.sequencer.submit(self.selection.files(), &options).await {
            Ok(outcome) => {
                self.message = Some(outcome.message.clone());
                self.share_link = outcome.share_link.clone();
                self.selection.clear();
                self.recipients.clear();
                self.sequencer.reset()?;
                Ok(outcome)
            }
            Err(e) => {
                if !matches!(e, UploadError::AlreadyInProgress) {
                    tracing::warn!("Upload failed: {}", e);
                }
                self.message = Some(e.user_message());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchPartitioner;
    use crate::transport::{
        BatchUploadRequest, CompleteUploadRequest, FlatUploadRequest, ProgressCallback,
        TransportError, TransportResult, UploadReceipt,
    };
    use crate::upload::error::GENERIC_FAILURE_MESSAGE;
    use crate::upload::types::UploadState;
    use crate::upload::DEFAULT_FLAT_FILE_CAP;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct StubService {
        reject: AtomicBool,
    }

    impl TransferService for StubService {
        async fn upload(
            &self,
            _request: BatchUploadRequest,
            _progress: ProgressCallback,
        ) -> TransportResult<UploadReceipt> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(TransportError::Request("connection refused".into()));
            }
            Ok(UploadReceipt {
                transfer_dir_url: "http://localhost:3000/uploads/t1".into(),
            })
        }

        async fn upload_flat(
            &self,
            _request: FlatUploadRequest,
            _progress: ProgressCallback,
        ) -> TransportResult<UploadReceipt> {
            Ok(UploadReceipt {
                transfer_dir_url: "http://localhost:3000/uploads/t2".into(),
            })
        }

        async fn complete_upload(&self, _request: CompleteUploadRequest) -> TransportResult<()> {
            Ok(())
        }
    }

    fn controller(service: Arc<StubService>) -> UploadController<StubService> {
        UploadController::new(UploadSequencer::new(
            service,
            BatchPartitioner::default(),
            DEFAULT_FLAT_FILE_CAP,
        ))
    }

    fn files() -> Vec<PendingFile> {
        vec![
            PendingFile::in_directory("dirA/a.txt", "a"),
            PendingFile::in_directory("dirA/sub/b.txt", "b"),
        ]
    }

    #[tokio::test]
    async fn test_success_clears_selection_and_recipients() {
        let mut controller = controller(Arc::new(StubService::default()));
        controller.select(files());
        controller.add_recipient("a@example.com").unwrap();

        let outcome = controller.submit().await.unwrap();
        assert_eq!(outcome.batches, 1);
        assert_eq!(controller.message(), Some("Files uploaded successfully"));
        assert!(controller.selection().is_empty());
        assert!(controller.recipients().is_empty());
        assert_eq!(controller.sequencer().snapshot().state, UploadState::Idle);
    }

    #[tokio::test]
    async fn test_failure_keeps_selection() {
        let service = Arc::new(StubService::default());
        service.reject.store(true, Ordering::SeqCst);
        let mut controller = controller(service.clone());
        controller.select(files());
        controller.add_recipient("a@example.com").unwrap();

        assert!(controller.submit().await.is_err());
        assert_eq!(controller.message(), Some(GENERIC_FAILURE_MESSAGE));
        assert_eq!(controller.selection().len(), 2);
        assert_eq!(controller.recipients().len(), 1);

        // Same selection goes through once the backend recovers
        service.reject.store(false, Ordering::SeqCst);
        controller.submit().await.unwrap();
        assert!(controller.selection().is_empty());
    }

    #[tokio::test]
    async fn test_missing_recipients_message() {
        let mut controller = controller(Arc::new(StubService::default()));
        controller.select(files());

        let err = controller.submit().await.unwrap_err();
        assert!(matches!(err, UploadError::MissingRecipients));
        assert_eq!(
            controller.message(),
            Some("At least one email address is required")
        );
    }

    #[tokio::test]
    async fn test_link_mode_exposes_share_link() {
        let mut controller = controller(Arc::new(StubService::default()));
        controller.set_delivery(DeliveryMode::Link);
        controller.set_mode(UploadMode::Files);
        controller.select(vec![PendingFile::flat("a.txt", "a")]);

        controller.submit().await.unwrap();
        assert_eq!(
            controller.share_link(),
            Some("http://localhost:3000/uploads/t2")
        );
    }

    #[test]
    fn test_mode_switch_discards_selection() {
        let mut controller = controller(Arc::new(StubService::default()));
        controller.select(files());

        controller.set_mode(UploadMode::Directory);
        assert_eq!(controller.selection().len(), 2);

        controller.set_mode(UploadMode::Files);
        assert!(controller.selection().is_empty());
    }

    #[test]
    fn test_invalid_recipient_message_surfaces() {
        let mut controller = controller(Arc::new(StubService::default()));
        controller.set_recipient_input("foo");
        let err = controller.commit_recipient().unwrap_err();

        assert!(matches!(err, UploadError::InvalidEmail(_)));
        assert_eq!(controller.message(), Some("Invalid email address"));
        assert!(controller.recipients().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_recipient_after_failed_submit() {
        let service = Arc::new(StubService::default());
        service.reject.store(true, Ordering::SeqCst);
        let mut controller = controller(service);
        controller.select(files());
        controller.add_recipient("a@example.com").unwrap();

        assert!(controller.submit().await.is_err());
        assert_eq!(controller.message(), Some(GENERIC_FAILURE_MESSAGE));

        // Typing clears the old status, a rejected blur replaces it
        controller.set_recipient_input("foo");
        assert_eq!(controller.message(), None);
        assert!(controller.commit_recipient().is_err());
        assert_eq!(controller.message(), Some("Invalid email address"));
        assert_eq!(controller.recipients().addresses(), ["a@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_recipient_after_success() {
        let mut controller = controller(Arc::new(StubService::default()));
        controller.select(files());
        controller.add_recipient("a@example.com").unwrap();
        controller.submit().await.unwrap();
        assert_eq!(controller.message(), Some("Files uploaded successfully"));

        assert!(controller.add_recipient("foo").is_err());
        assert_eq!(controller.message(), Some("Invalid email address"));
    }
}
