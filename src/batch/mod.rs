pub mod error;
pub mod partitioner;
pub mod types;

pub use error::{BatchError, BatchResult};
pub use partitioner::{BatchPartitioner, MAX_FILES_PER_BATCH};
pub use types::{Batch, FileSource, PendingFile, Selection};
