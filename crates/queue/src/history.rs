//! Batch history store.

use crate::types::UploadBatch;

/// Completed batches, most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchHistory {
    batches: Vec<UploadBatch>,
    /// Maximum retained batches (0 = unbounded).
    limit: usize,
}

impl BatchHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            batches: Vec::new(),
            limit,
        }
    }

    /// Prepends a batch. Returns `false` if one with the same id exists.
    ///
    /// The oldest batches are dropped once the limit is exceeded.
    pub fn record(&mut self, batch: UploadBatch) -> bool {
        if self.batches.iter().any(|b| b.id == batch.id) {
            return false;
        }
        self.batches.insert(0, batch);
        if self.limit > 0 && self.batches.len() > self.limit {
            self.batches.truncate(self.limit);
        }
        true
    }

    pub fn latest(&self) -> Option<&UploadBatch> {
        self.batches.first()
    }

    pub fn get(&self, batch_id: &str) -> Option<&UploadBatch> {
        self.batches.iter().find(|b| b.id == batch_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadBatch> {
        self.batches.iter()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Drops the most recent batch, returning it.
    pub fn clear_most_recent(&mut self) -> Option<UploadBatch> {
        if self.batches.is_empty() {
            None
        } else {
            Some(self.batches.remove(0))
        }
    }

    /// Keeps only the most recent batch. Returns how many were dropped.
    pub fn clear_older(&mut self) -> usize {
        let dropped = self.batches.len().saturating_sub(1);
        self.batches.truncate(1);
        dropped
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}
