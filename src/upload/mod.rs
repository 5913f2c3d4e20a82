mod controller;
mod error;
mod notifier;
mod recipients;
mod sequencer;
mod state_machine;
mod types;

pub use controller::UploadController;
pub use error::{UploadError, UploadResult, GENERIC_FAILURE_MESSAGE};
pub use notifier::CompletionNotifier;
pub use recipients::{validate_email, Recipients, INVALID_EMAIL_MESSAGE};
pub use sequencer::{UploadSequencer, DEFAULT_FLAT_FILE_CAP};
pub use state_machine::UploadStateMachine;
pub use types::{
    DeliveryMode, SubmitOptions, UploadEvent, UploadMode, UploadOutcome, UploadProgress,
    UploadSession, UploadState,
};
