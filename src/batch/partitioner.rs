use crate::batch::error::{BatchError, BatchResult};
use crate::batch::types::{Batch, PendingFile};

/// Upper bound on files per upload request
pub const MAX_FILES_PER_BATCH: usize = 1500;

#[derive(Debug, Clone, Copy)]
pub struct BatchPartitioner {
    max_batch_size: usize,
}

impl Default for BatchPartitioner {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_FILES_PER_BATCH,
        }
    }
}

impl BatchPartitioner {
    pub fn new(max_batch_size: usize) -> BatchResult<Self> {
        if max_batch_size == 0 {
            return Err(BatchError::InvalidBatchSize(max_batch_size));
        }
        Ok(Self { max_batch_size })
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Number of batches needed for `total` files: ceil(total / max)
    pub fn batch_count(&self, total: usize) -> u32 {
        total.div_ceil(self.max_batch_size) as u32
    }

    /// Split files into ordered, disjoint batches. Empty input yields no batches.
    pub fn partition<'a>(&self, files: &'a [PendingFile]) -> Vec<Batch<'a>> {
        files
            .chunks(self.max_batch_size)
            .enumerate()
            .map(|(i, files)| Batch {
                number: i as u32 + 1,
                files,
            })
            .collect()
    }
}
