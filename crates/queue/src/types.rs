//! Data types for the upload queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rapidupload_transfer::FileSource;

use crate::progress::ProgressSnapshot;

/// Lifecycle of a queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
}

impl ItemStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_settled(self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }
}

/// One file's transfer lifecycle unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    pub id: String,
    pub source: FileSource,
    pub status: ItemStatus,
    /// Percent complete, `0..=100`.
    pub progress: u8,
    /// Failure reason; only set while `status` is `Failed`.
    pub error: Option<String>,
    /// Backend id returned by `initiate`.
    pub remote_id: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl UploadItem {
    pub(crate) fn new(id: String, source: FileSource) -> Self {
        Self {
            id,
            source,
            status: ItemStatus::Pending,
            progress: 0,
            error: None,
            remote_id: None,
            added_at: Utc::now(),
        }
    }

    /// Size of the payload, used as the item's progress weight.
    pub fn size(&self) -> u64 {
        self.source.size
    }
}

/// Immutable record of a round in which every item completed.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBatch {
    pub id: String,
    /// Items in work-list order.
    pub items: Vec<UploadItem>,
    pub completed_at: DateTime<Utc>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of every item's size.
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(UploadItem::size).sum()
    }
}

/// Summary of a settled round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub batch_id: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Whether the round was recorded in batch history.
    pub promoted: bool,
}

/// Notification emitted while a round runs.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// A round captured its work list.
    RoundStarted { batch_id: String, items: usize },
    /// An item was admitted and marked uploading.
    ItemStarted { item_id: String },
    /// Item percent changed; `overall` is the aggregate after the change.
    ItemProgress {
        item_id: String,
        progress: u8,
        overall: ProgressSnapshot,
    },
    ItemCompleted { item_id: String },
    ItemFailed { item_id: String, error: String },
    /// Every task of the round has finished.
    RoundSettled { outcome: RoundOutcome },
}
