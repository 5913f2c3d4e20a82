use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),
}

pub type BatchResult<T> = Result<T, BatchError>;
