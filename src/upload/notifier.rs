use crate::transport::{CompleteUploadRequest, TransferService};
use crate::upload::error::{UploadError, UploadResult};
use crate::upload::types::{UploadSession, UploadState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sends the completion call for a directory upload, at most once per submission.
///
/// The notifier is armed when a submission starts and disarms itself on the
/// first observation of the `Completing` state, so seeing that state again
/// (a re-render, a repeated poll) never produces a second call.
pub struct CompletionNotifier<S> {
    service: Arc<S>,
    armed: AtomicBool,
}

impl<S: TransferService> CompletionNotifier<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            armed: AtomicBool::new(false),
        }
    }

    /// Allow one notification for the submission that is starting
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Fire if `session` just entered `Completing`. Returns whether a call was made.
    pub async fn observe(&self, session: &UploadSession) -> UploadResult<bool> {
        if session.state != UploadState::Completing {
            return Ok(false);
        }
        let upload_dir = session
            .transfer_dir
            .clone()
            .ok_or(UploadError::MissingTransferDir)?;

        if !self.armed.swap(false, Ordering::SeqCst) {
            tracing::debug!(session_id = %session.session_id, "Completion already sent");
            return Ok(false);
        }

        let request = CompleteUploadRequest {
            upload_dir,
            email_addresses: session.completion_recipients(),
        };
        tracing::info!(
            session_id = %session.session_id,
            upload_dir = %request.upload_dir,
            "Sending completion notification"
        );

        self.service
            .complete_upload(request)
            .await
            .map_err(UploadError::CompletionFailed)?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{
        BatchUploadRequest, FlatUploadRequest, ProgressCallback, TransportError, TransportResult,
        UploadReceipt,
    };
    use crate::upload::types::{DeliveryMode, UploadMode};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingService {
        completions: Mutex<Vec<CompleteUploadRequest>>,
        fail: bool,
    }

    impl TransferService for RecordingService {
        async fn upload(
            &self,
            _request: BatchUploadRequest,
            _progress: ProgressCallback,
        ) -> TransportResult<UploadReceipt> {
            unreachable!("notifier never uploads")
        }

        async fn upload_flat(
            &self,
            _request: FlatUploadRequest,
            _progress: ProgressCallback,
        ) -> TransportResult<UploadReceipt> {
            unreachable!("notifier never uploads")
        }

        async fn complete_upload(&self, request: CompleteUploadRequest) -> TransportResult<()> {
            self.completions.lock().push(request);
            if self.fail {
                return Err(TransportError::Status {
                    status: 500,
                    message: None,
                });
            }
            Ok(())
        }
    }

    fn completing_session(delivery: DeliveryMode) -> UploadSession {
        let mut session = UploadSession::new(
            1,
            UploadMode::Directory,
            delivery,
            vec!["a@example.com".into(), "b@example.com".into()],
        );
        session.transfer_dir = Some("dir-1".into());
        session.current_batch_index = 2;
        session.state = UploadState::Completing;
        session
    }

    #[tokio::test]
    async fn test_fires_once_per_arm() {
        let service = Arc::new(RecordingService::default());
        let notifier = CompletionNotifier::new(service.clone());
        let session = completing_session(DeliveryMode::Email);

        notifier.arm();
        assert!(notifier.observe(&session).await.unwrap());
        assert!(!notifier.observe(&session).await.unwrap());
        assert!(!notifier.observe(&session).await.unwrap());

        let calls = service.completions.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].upload_dir, "dir-1");
        assert_eq!(
            calls[0].email_addresses.as_deref(),
            Some("a@example.com,b@example.com")
        );
    }

    #[tokio::test]
    async fn test_ignores_other_states() {
        let service = Arc::new(RecordingService::default());
        let notifier = CompletionNotifier::new(service.clone());
        notifier.arm();

        let mut session = completing_session(DeliveryMode::Email);
        session.state = UploadState::Failed {
            batch: 1,
            error: "x".into(),
        };
        assert!(!notifier.observe(&session).await.unwrap());
        assert!(notifier.is_armed());
        assert!(service.completions.lock().is_empty());
    }

    #[tokio::test]
    async fn test_link_delivery_sends_null_recipients() {
        let service = Arc::new(RecordingService::default());
        let notifier = CompletionNotifier::new(service.clone());
        notifier.arm();

        notifier
            .observe(&completing_session(DeliveryMode::Link))
            .await
            .unwrap();
        assert_eq!(service.completions.lock()[0].email_addresses, None);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let service = Arc::new(RecordingService {
            fail: true,
            ..Default::default()
        });
        let notifier = CompletionNotifier::new(service);
        notifier.arm();

        let result = notifier
            .observe(&completing_session(DeliveryMode::Email))
            .await;
        assert!(matches!(result, Err(UploadError::CompletionFailed(_))));
        assert!(!notifier.is_armed());
    }
}
