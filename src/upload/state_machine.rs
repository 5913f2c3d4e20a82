use crate::upload::error::{UploadError, UploadResult};
use crate::upload::types::{UploadEvent, UploadMode, UploadProgress, UploadSession, UploadState};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

// Uploading never reports 100; the last step waits for the server's answer
const IN_FLIGHT_CEILING: f32 = 99.0;

/// Owner of the upload session. Every change goes through [`transition`],
/// which publishes a progress snapshot whenever something visible changed.
///
/// [`transition`]: UploadStateMachine::transition
pub struct UploadStateMachine {
    session: Arc<RwLock<UploadSession>>,
    event_tx: mpsc::UnboundedSender<UploadProgress>,
    event_rx: Arc<RwLock<Option<mpsc::UnboundedReceiver<UploadProgress>>>>,
}

impl Default for UploadStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadStateMachine {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            session: Arc::new(RwLock::new(UploadSession::idle())),
            event_tx,
            event_rx: Arc::new(RwLock::new(Some(event_rx))),
        }
    }

    /// Get current state
    pub fn current_state(&self) -> UploadState {
        self.session.read().state.clone()
    }

    /// Copy of the whole session
    pub fn snapshot(&self) -> UploadSession {
        self.session.read().clone()
    }

    /// Transition the session based on event
    pub fn transition(&self, event: UploadEvent) -> UploadResult<UploadState> {
        let mut session = self.session.write();
        let before = (session.state.clone(), session.progress_percent);

        match (&before.0, event) {
            // Starting a submission
            (
                UploadState::Idle | UploadState::Completed | UploadState::Failed { .. },
                UploadEvent::Start {
                    total_batches,
                    mode,
                    delivery,
                    recipients,
                },
            ) => {
                if total_batches == 0 {
                    return Err(UploadError::InvalidStateTransition(
                        "cannot start a submission without batches".into(),
                    ));
                }
                *session = UploadSession::new(total_batches, mode, delivery, recipients);
            }

            (UploadState::Uploading | UploadState::Completing, UploadEvent::Start { .. }) => {
                return Err(UploadError::AlreadyInProgress);
            }

            // Bytes of the current batch going out
            (UploadState::Uploading, UploadEvent::BatchProgress { batch, acked, total })
                if batch == session.current_batch_index =>
            {
                if total > 0 {
                    let fraction = (acked.min(total) as f64 / total as f64) as f32;
                    let overall =
                        ((batch - 1) as f32 + fraction) / session.total_batches as f32 * 100.0;
                    let overall = overall.min(IN_FLIGHT_CEILING);
                    session.progress_percent = session.progress_percent.max(overall);
                }
            }

            // Server acknowledged the current batch
            (UploadState::Uploading, UploadEvent::BatchAcked { batch, transfer_dir })
                if batch == session.current_batch_index =>
            {
                if batch == 1 {
                    session.transfer_dir = transfer_dir;
                }
                session.current_batch_index += 1;

                if session.all_batches_done() {
                    session.progress_percent = 100.0;
                    session.state = match session.upload_mode {
                        UploadMode::Directory => UploadState::Completing,
                        UploadMode::Files => UploadState::Completed,
                    };
                } else {
                    let overall = batch as f32 / session.total_batches as f32 * 100.0;
                    session.progress_percent = session.progress_percent.max(overall);
                }
            }

            // Batch rejected: halt at the failing index
            (UploadState::Uploading, UploadEvent::BatchFailed { batch, error })
                if batch == session.current_batch_index =>
            {
                session.progress_percent = 0.0;
                session.state = UploadState::Failed { batch, error };
            }

            (UploadState::Completing, UploadEvent::CompletionAcked) => {
                session.state = UploadState::Completed;
            }

            (UploadState::Completing, UploadEvent::CompletionFailed { error }) => {
                session.progress_percent = 0.0;
                session.state = UploadState::Failed {
                    batch: session.current_batch_index,
                    error,
                };
            }

            // Drop the finished session
            (
                UploadState::Idle | UploadState::Completed | UploadState::Failed { .. },
                UploadEvent::Reset,
            ) => {
                *session = UploadSession::idle();
            }

            // Invalid transition
            (state, event) => {
                return Err(UploadError::InvalidStateTransition(format!(
                    "Cannot handle {:?} in state {:?}",
                    event, state
                )));
            }
        }

        session.touch();
        if before != (session.state.clone(), session.progress_percent) {
            // Nobody listening is fine
            let _ = self.event_tx.send(session.progress());
        }

        Ok(session.state.clone())
    }

    /// Take event receiver (can only be called once)
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<UploadProgress>> {
        self.event_rx.write().take()
    }
}

impl Clone for UploadStateMachine {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            event_tx: self.event_tx.clone(),
            event_rx: self.event_rx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::types::DeliveryMode;

    fn start(sm: &UploadStateMachine, total_batches: u32, mode: UploadMode) {
        sm.transition(UploadEvent::Start {
            total_batches,
            mode,
            delivery: DeliveryMode::Email,
            recipients: vec!["a@example.com".into()],
        })
        .unwrap();
    }

    fn ack(sm: &UploadStateMachine, batch: u32) -> UploadState {
        sm.transition(UploadEvent::BatchAcked {
            batch,
            transfer_dir: Some(format!("dir-{batch}")),
        })
        .unwrap()
    }

    #[test]
    fn test_state_machine_creation() {
        let sm = UploadStateMachine::new();
        assert_eq!(sm.current_state(), UploadState::Idle);
        assert_eq!(sm.snapshot().current_batch_index, 0);
    }

    #[test]
    fn test_directory_run_reaches_completing() {
        let sm = UploadStateMachine::new();
        start(&sm, 2, UploadMode::Directory);

        assert_eq!(ack(&sm, 1), UploadState::Uploading);
        assert_eq!(sm.snapshot().current_batch_index, 2);
        assert_eq!(sm.snapshot().progress_percent, 50.0);

        assert_eq!(ack(&sm, 2), UploadState::Completing);
        let session = sm.snapshot();
        assert_eq!(session.current_batch_index, 3);
        assert!(session.all_batches_done());
        assert_eq!(session.progress_percent, 100.0);
        // Only batch 1 sets the identifier
        assert_eq!(session.transfer_dir.as_deref(), Some("dir-1"));

        assert_eq!(
            sm.transition(UploadEvent::CompletionAcked).unwrap(),
            UploadState::Completed
        );
    }

    #[test]
    fn test_duplicate_completion_rejected() {
        let sm = UploadStateMachine::new();
        start(&sm, 1, UploadMode::Directory);
        ack(&sm, 1);
        sm.transition(UploadEvent::CompletionAcked).unwrap();

        let result = sm.transition(UploadEvent::CompletionAcked);
        assert!(matches!(result, Err(UploadError::InvalidStateTransition(_))));
    }

    #[test]
    fn test_flat_run_skips_completing() {
        let sm = UploadStateMachine::new();
        start(&sm, 1, UploadMode::Files);
        assert_eq!(ack(&sm, 1), UploadState::Completed);
    }

    #[test]
    fn test_progress_formula_and_ceiling() {
        let sm = UploadStateMachine::new();
        start(&sm, 4, UploadMode::Directory);
        ack(&sm, 1);

        sm.transition(UploadEvent::BatchProgress {
            batch: 2,
            acked: 50,
            total: 100,
        })
        .unwrap();
        assert_eq!(sm.snapshot().progress_percent, 37.5);

        // Progress never moves backwards
        sm.transition(UploadEvent::BatchProgress {
            batch: 2,
            acked: 10,
            total: 100,
        })
        .unwrap();
        assert_eq!(sm.snapshot().progress_percent, 37.5);

        ack(&sm, 2);
        ack(&sm, 3);
        sm.transition(UploadEvent::BatchProgress {
            batch: 4,
            acked: 100,
            total: 100,
        })
        .unwrap();
        assert_eq!(sm.snapshot().progress_percent, IN_FLIGHT_CEILING);
    }

    #[test]
    fn test_stale_batch_events_rejected() {
        let sm = UploadStateMachine::new();
        start(&sm, 3, UploadMode::Directory);

        assert!(sm
            .transition(UploadEvent::BatchAcked {
                batch: 2,
                transfer_dir: None
            })
            .is_err());
        assert!(sm
            .transition(UploadEvent::BatchProgress {
                batch: 3,
                acked: 1,
                total: 1
            })
            .is_err());
        assert_eq!(sm.snapshot().current_batch_index, 1);
    }

    #[test]
    fn test_failure_halts_at_batch() {
        let sm = UploadStateMachine::new();
        start(&sm, 3, UploadMode::Directory);
        ack(&sm, 1);
        ack(&sm, 2);

        let state = sm
            .transition(UploadEvent::BatchFailed {
                batch: 3,
                error: "boom".into(),
            })
            .unwrap();
        assert_eq!(
            state,
            UploadState::Failed {
                batch: 3,
                error: "boom".into()
            }
        );
        let session = sm.snapshot();
        assert_eq!(session.current_batch_index, 3);
        assert_eq!(session.progress_percent, 0.0);

        // Re-submittable from scratch
        start(&sm, 3, UploadMode::Directory);
        assert_eq!(sm.snapshot().current_batch_index, 1);
        assert_eq!(sm.snapshot().transfer_dir, None);
    }

    #[test]
    fn test_start_while_in_flight() {
        let sm = UploadStateMachine::new();
        start(&sm, 2, UploadMode::Directory);

        let result = sm.transition(UploadEvent::Start {
            total_batches: 1,
            mode: UploadMode::Directory,
            delivery: DeliveryMode::Link,
            recipients: vec![],
        });
        assert!(matches!(result, Err(UploadError::AlreadyInProgress)));
        assert_eq!(sm.snapshot().total_batches, 2);
    }

    #[test]
    fn test_reset_only_when_settled() {
        let sm = UploadStateMachine::new();
        start(&sm, 1, UploadMode::Directory);
        assert!(sm.transition(UploadEvent::Reset).is_err());

        ack(&sm, 1);
        sm.transition(UploadEvent::CompletionAcked).unwrap();
        sm.transition(UploadEvent::Reset).unwrap();
        assert_eq!(sm.current_state(), UploadState::Idle);
        assert!(sm.snapshot().session_id.is_empty());
    }

    #[test]
    fn test_events_published() {
        let sm = UploadStateMachine::new();
        let mut rx = sm.take_receiver().unwrap();
        assert!(sm.take_receiver().is_none());

        start(&sm, 1, UploadMode::Directory);
        ack(&sm, 1);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.state, UploadState::Uploading);
        assert_eq!(first.progress_percent, 0.0);

        let second = rx.try_recv().unwrap();
        assert_eq!(second.state, UploadState::Completing);
        assert_eq!(second.progress_percent, 100.0);
        assert!(rx.try_recv().is_err());
    }
}
