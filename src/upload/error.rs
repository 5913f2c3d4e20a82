use crate::batch::BatchError;
use crate::transport::TransportError;
use thiserror::Error;

/// Status shown for every transport-level upload failure
pub const GENERIC_FAILURE_MESSAGE: &str = "Error uploading files";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No files selected")]
    EmptySelection,

    #[error("At least one email address is required")]
    MissingRecipients,

    #[error("Files uploaded max is {max}")]
    TooManyFiles { count: usize, max: usize },

    #[error("Invalid email address")]
    InvalidEmail(String),

    #[error("An upload is already in progress")]
    AlreadyInProgress,

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Batch {batch} failed: {source}")]
    BatchFailed {
        batch: u32,
        #[source]
        source: TransportError,
    },

    #[error("Server response did not include a transfer directory")]
    MissingTransferDir,

    #[error("Completion notification failed: {0}")]
    CompletionFailed(#[source] TransportError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

impl UploadError {
    /// Rejected before any request was sent
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            UploadError::EmptySelection
                | UploadError::MissingRecipients
                | UploadError::TooManyFiles { .. }
                | UploadError::InvalidEmail(_)
        )
    }

    /// Message for the user. Failures past validation collapse into one status.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::AlreadyInProgress => self.to_string(),
            e if e.is_validation() => e.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
