use crate::transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not save archive to {path}: {reason}")]
    Persist { path: String, reason: String },

    #[error("Invalid transfer id: {0:?}")]
    InvalidTransferId(String),

    #[error("A download is already in progress")]
    AlreadyInProgress,
}

pub type DownloadResult<T> = Result<T, DownloadError>;
