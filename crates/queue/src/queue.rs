//! The upload queue: owner of session state.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use rapidupload_transfer::{FileSource, TransferClient};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::progress::ProgressSnapshot;
use crate::state::SessionState;
use crate::types::{ItemStatus, UploadBatch, UploadEvent, UploadItem};

/// Upload queue and scheduler front-end.
///
/// Cloning is cheap and every clone shares the same state. All writes go
/// through the state channel as whole-state transforms; readers either
/// [`subscribe`](Self::subscribe) or take a [`snapshot`](Self::snapshot).
#[derive(Clone)]
pub struct UploadQueue {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) state: watch::Sender<SessionState>,
    pub(crate) client: Arc<dyn TransferClient>,
    pub(crate) config: QueueConfig,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<UploadEvent>>>,
}

impl UploadQueue {
    /// Creates an empty queue that uploads through `client`.
    pub fn new(client: Arc<dyn TransferClient>, config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;

        let (state, _) = watch::channel(SessionState::new(config.history_limit));
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer);

        Ok(Self {
            inner: Arc::new(Inner {
                state,
                client,
                config,
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.inner
            .events_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<UploadItem> {
        self.inner.state.borrow().items().cloned().collect()
    }

    pub fn item(&self, id: &str) -> Option<UploadItem> {
        self.inner.state.borrow().item(id).cloned()
    }

    /// Completed batches, most recent first.
    pub fn history(&self) -> Vec<UploadBatch> {
        self.inner.state.borrow().history().iter().cloned().collect()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.inner.state.borrow().progress()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().is_running()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Queues a file as a pending item and returns its id.
    ///
    /// No size or type validation happens here.
    pub fn add(&self, source: FileSource) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        debug!(item = %id, file = %source.name, size = source.size, "item queued");
        let item = UploadItem::new(id.clone(), source);
        self.inner.state.send_modify(|s| s.insert(item));
        id
    }

    /// Reads file metadata from disk and queues it.
    pub fn add_path(&self, path: impl AsRef<Path>) -> Result<String, QueueError> {
        let source = FileSource::from_path(path)?;
        Ok(self.add(source))
    }

    /// Removes an item in any status. Does not cancel an in-flight transfer.
    pub fn remove(&self, id: &str) -> bool {
        let mut was_uploading = false;
        let removed = self.inner.state.send_if_modified(|s| {
            was_uploading = s
                .item(id)
                .is_some_and(|i| i.status == ItemStatus::Uploading);
            s.remove(id)
        });
        if was_uploading {
            warn!(item = %id, "removed item while uploading; transfer continues");
        }
        removed
    }

    /// Removes every active item. Returns how many were removed.
    pub fn remove_all(&self) -> usize {
        let mut removed = 0;
        self.inner.state.send_if_modified(|s| {
            removed = s.remove_all();
            removed > 0
        });
        removed
    }

    /// Resets a failed item to pending. No-op for any other status.
    pub fn retry(&self, id: &str) -> bool {
        let retried = self.update_status(id, ItemStatus::Pending, None);
        if retried {
            debug!(item = %id, "item queued for retry");
        }
        retried
    }

    /// Clears items, history and round progress.
    pub fn reset(&self) {
        self.inner.state.send_modify(SessionState::reset);
        info!("queue reset");
    }

    /// Drops the most recent batch from history.
    pub fn clear_most_recent_batch(&self) -> Option<UploadBatch> {
        let mut cleared = None;
        self.inner.state.send_if_modified(|s| {
            cleared = s.clear_most_recent_batch();
            cleared.is_some()
        });
        cleared
    }

    /// Keeps only the most recent batch. Returns how many were dropped.
    pub fn clear_older_batches(&self) -> usize {
        let mut dropped = 0;
        self.inner.state.send_if_modified(|s| {
            dropped = s.clear_older_batches();
            dropped > 0
        });
        dropped
    }

    // -----------------------------------------------------------------------
    // Scheduler entry points
    // -----------------------------------------------------------------------

    /// Records a transfer percent for an uploading item.
    pub(crate) fn update_progress(&self, id: &str, percent: u8) -> bool {
        let mut overall = None;
        self.inner.state.send_if_modified(|s| {
            overall = s.update_progress(id, percent);
            overall.is_some()
        });

        match overall {
            Some(overall) => {
                self.emit(UploadEvent::ItemProgress {
                    item_id: id.to_string(),
                    progress: percent.min(100),
                    overall,
                });
                true
            }
            None => false,
        }
    }

    /// Applies a lifecycle transition and emits the matching event.
    pub(crate) fn update_status(
        &self,
        id: &str,
        status: ItemStatus,
        error: Option<String>,
    ) -> bool {
        let mut applied = false;
        self.inner.state.send_if_modified(|s| {
            applied = s.update_status(id, status, error);
            applied
        });
        if !applied {
            return false;
        }

        match status {
            ItemStatus::Uploading => {
                self.emit(UploadEvent::ItemStarted {
                    item_id: id.to_string(),
                })
            }
            ItemStatus::Completed => {
                self.emit(UploadEvent::ItemCompleted {
                    item_id: id.to_string(),
                })
            }
            ItemStatus::Failed => self.emit_failed(id),
            ItemStatus::Pending => {}
        }
        true
    }

    pub(crate) fn emit_failed(&self, id: &str) {
        let error = self
            .item(id)
            .and_then(|i| i.error)
            .unwrap_or_else(|| "upload failed".into());
        self.emit(UploadEvent::ItemFailed {
            item_id: id.to_string(),
            error,
        });
    }

    /// Sends an event without waiting. Events are dropped when the channel
    /// is full or nobody took the receiver; state stays authoritative.
    pub(crate) fn emit(&self, event: UploadEvent) {
        if let Err(e) = self.inner.events_tx.try_send(event) {
            trace!(error = %e, "upload event dropped");
        }
    }
}
