//! Session state and its total-state transforms.
//!
//! [`SessionState`] is held in a `watch` channel by the queue. Every write is
//! one of the `&mut self` methods below, applied inside `send_modify` /
//! `send_if_modified`, so concurrent completions never interleave partial
//! writes.

use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::error::QueueError;
use crate::history::BatchHistory;
use crate::progress::{ProgressSnapshot, aggregate};
use crate::types::{ItemStatus, RoundOutcome, UploadBatch, UploadItem};

/// Message recorded on items whose task ended without settling them.
pub(crate) const ABANDONED_MESSAGE: &str = "upload task ended unexpectedly";

#[derive(Debug, Clone)]
struct Round {
    batch_id: String,
    /// Item ids captured at round start, in admission order.
    work_list: Vec<String>,
    started_at: Instant,
}

/// Live queue contents: active items, batch history and round progress.
#[derive(Debug, Clone)]
pub struct SessionState {
    items: IndexMap<String, UploadItem>,
    history: BatchHistory,
    round: Option<Round>,
    progress: ProgressSnapshot,
}

impl SessionState {
    pub(crate) fn new(history_limit: usize) -> Self {
        Self {
            items: IndexMap::new(),
            history: BatchHistory::new(history_limit),
            round: None,
            progress: ProgressSnapshot::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Active items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &UploadItem> {
        self.items.values()
    }

    pub fn item(&self, id: &str) -> Option<&UploadItem> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of active items in `status`.
    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.values().filter(|i| i.status == status).count()
    }

    pub fn history(&self) -> &BatchHistory {
        &self.history
    }

    /// Aggregate of the running round, or of the last one after it settles.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress
    }

    pub fn is_running(&self) -> bool {
        self.round.is_some()
    }

    /// Batch id of the running round.
    pub fn round_batch_id(&self) -> Option<&str> {
        self.round.as_ref().map(|r| r.batch_id.as_str())
    }

    /// Ids still part of the running round.
    pub fn round_items(&self) -> &[String] {
        self.round.as_ref().map_or(&[], |r| r.work_list.as_slice())
    }

    // -----------------------------------------------------------------------
    // Queue mutations
    // -----------------------------------------------------------------------

    pub(crate) fn insert(&mut self, item: UploadItem) {
        self.items.insert(item.id.clone(), item);
    }

    /// Removes an item regardless of status. An in-flight transfer keeps
    /// running; its later updates find no item and are dropped.
    pub(crate) fn remove(&mut self, id: &str) -> bool {
        if self.items.shift_remove(id).is_none() {
            return false;
        }
        if let Some(round) = self.round.as_mut() {
            round.work_list.retain(|w| w != id);
        }
        self.refresh_progress();
        true
    }

    pub(crate) fn remove_all(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        if let Some(round) = self.round.as_mut() {
            round.work_list.clear();
        }
        self.refresh_progress();
        removed
    }

    /// Clears items, history and the round.
    pub(crate) fn reset(&mut self) {
        self.items.clear();
        self.history.clear();
        self.round = None;
        self.progress = ProgressSnapshot::default();
    }

    pub(crate) fn clear_most_recent_batch(&mut self) -> Option<UploadBatch> {
        self.history.clear_most_recent()
    }

    pub(crate) fn clear_older_batches(&mut self) -> usize {
        self.history.clear_older()
    }

    // -----------------------------------------------------------------------
    // Item transitions
    // -----------------------------------------------------------------------

    /// Applies a status transition. Returns `false` for unknown ids and
    /// transitions the lifecycle does not allow.
    ///
    /// Allowed: pending → uploading, uploading → completed | failed,
    /// failed → pending (retry).
    pub(crate) fn update_status(
        &mut self,
        id: &str,
        status: ItemStatus,
        error: Option<String>,
    ) -> bool {
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };

        match (item.status, status) {
            (ItemStatus::Pending, ItemStatus::Uploading) => {
                item.progress = 0;
                item.error = None;
            }
            (ItemStatus::Uploading, ItemStatus::Completed) => {
                item.progress = 100;
                item.error = None;
            }
            (ItemStatus::Uploading, ItemStatus::Failed) => {
                item.error = Some(error.unwrap_or_else(|| "upload failed".into()));
            }
            (ItemStatus::Failed, ItemStatus::Pending) => {
                item.progress = 0;
                item.error = None;
                item.remote_id = None;
            }
            _ => return false,
        }
        item.status = status;
        self.refresh_progress();
        true
    }

    /// Records a transfer percent. Only uploading items accept progress, and
    /// values below the current percent are ignored.
    ///
    /// Returns the new aggregate when the update was applied.
    pub(crate) fn update_progress(&mut self, id: &str, percent: u8) -> Option<ProgressSnapshot> {
        let item = self.items.get_mut(id)?;
        let percent = percent.min(100);
        if item.status != ItemStatus::Uploading || percent < item.progress {
            return None;
        }
        item.progress = percent;
        self.refresh_progress();
        Some(self.progress)
    }

    pub(crate) fn set_remote_id(&mut self, id: &str, remote_id: &str) -> bool {
        match self.items.get_mut(id) {
            Some(item) => {
                item.remote_id = Some(remote_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Demotes a completed item the server refused to confirm.
    pub(crate) fn reject(&mut self, id: &str, error: String) -> bool {
        match self.items.get_mut(id) {
            Some(item) if item.status == ItemStatus::Completed => {
                item.status = ItemStatus::Failed;
                item.error = Some(error);
                self.refresh_progress();
                true
            }
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Rounds
    // -----------------------------------------------------------------------

    /// Captures every pending item as the work list of a new round.
    pub(crate) fn begin_round(&mut self, batch_id: &str) -> Result<Vec<String>, QueueError> {
        if self.round.is_some() {
            return Err(QueueError::RoundInProgress);
        }

        let work_list: Vec<String> = self
            .items
            .values()
            .filter(|i| i.status == ItemStatus::Pending)
            .map(|i| i.id.clone())
            .collect();
        if work_list.is_empty() {
            return Err(QueueError::NoPendingItems);
        }

        self.round = Some(Round {
            batch_id: batch_id.to_string(),
            work_list: work_list.clone(),
            started_at: Instant::now(),
        });
        self.refresh_progress();
        Ok(work_list)
    }

    /// Whether `id` is still pending and part of the round `batch_id`.
    pub(crate) fn is_admissible(&self, batch_id: &str, id: &str) -> bool {
        self.round
            .as_ref()
            .is_some_and(|r| r.batch_id == batch_id && r.work_list.iter().any(|w| w == id))
            && self
                .items
                .get(id)
                .is_some_and(|i| i.status == ItemStatus::Pending)
    }

    /// Completed round items with a backend id: `(item id, backend id, size)`.
    pub(crate) fn awaiting_confirmation(&self) -> Vec<(String, String, u64)> {
        self.round_items()
            .iter()
            .filter_map(|id| self.items.get(id))
            .filter(|i| i.status == ItemStatus::Completed)
            .filter_map(|i| {
                i.remote_id
                    .as_ref()
                    .map(|remote| (i.id.clone(), remote.clone(), i.size()))
            })
            .collect()
    }

    /// Ends round `batch_id` and decides whether it becomes a batch.
    ///
    /// Round items still uploading are failed first. The round is promoted
    /// only when every remaining work-list item completed; its items then
    /// move into history and only pending/uploading items stay active.
    /// Otherwise nothing is removed.
    ///
    /// Returns the outcome and the ids failed as abandoned.
    pub(crate) fn settle_round(
        &mut self,
        batch_id: &str,
        now: DateTime<Utc>,
    ) -> (RoundOutcome, Vec<String>) {
        let mut outcome = RoundOutcome {
            batch_id: batch_id.to_string(),
            attempted: 0,
            succeeded: 0,
            failed: 0,
            promoted: false,
        };

        if self.round_batch_id() != Some(batch_id) {
            return (outcome, Vec::new());
        }

        let abandoned: Vec<String> = self
            .round_items()
            .iter()
            .filter(|id| {
                self.items
                    .get(*id)
                    .is_some_and(|i| i.status == ItemStatus::Uploading)
            })
            .cloned()
            .collect();
        for id in &abandoned {
            self.update_status(id, ItemStatus::Failed, Some(ABANDONED_MESSAGE.into()));
        }

        self.refresh_progress();
        let Some(round) = self.round.take() else {
            return (outcome, abandoned);
        };

        outcome.attempted = round.work_list.len();
        for id in &round.work_list {
            match self.items.get(id).map(|i| i.status) {
                Some(ItemStatus::Completed) => outcome.succeeded += 1,
                Some(ItemStatus::Failed) => outcome.failed += 1,
                _ => {}
            }
        }
        outcome.promoted = outcome.succeeded > 0 && outcome.succeeded == outcome.attempted;

        if outcome.promoted {
            let items = round
                .work_list
                .iter()
                .filter_map(|id| self.items.get(id).cloned())
                .collect();
            self.history.record(UploadBatch {
                id: round.batch_id,
                items,
                completed_at: now,
            });
            self.items
                .retain(|_, i| matches!(i.status, ItemStatus::Pending | ItemStatus::Uploading));
        }

        (outcome, abandoned)
    }

    fn refresh_progress(&mut self) {
        let Some(round) = self.round.as_ref() else {
            return;
        };
        let items = round.work_list.iter().filter_map(|id| self.items.get(id));
        self.progress = aggregate(items, round.started_at.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapidupload_transfer::FileSource;

    fn state_with(sizes: &[u64]) -> (SessionState, Vec<String>) {
        let mut state = SessionState::new(0);
        let ids: Vec<String> = sizes
            .iter()
            .enumerate()
            .map(|(n, &size)| {
                let id = format!("item-{n}");
                let source =
                    FileSource::new(format!("/tmp/{id}.jpg"), id.clone(), "image/jpeg", size);
                state.insert(UploadItem::new(id.clone(), source));
                id
            })
            .collect();
        (state, ids)
    }

    fn finish(state: &mut SessionState, id: &str, status: ItemStatus) {
        assert!(state.update_status(id, ItemStatus::Uploading, None));
        let error = (status == ItemStatus::Failed).then(|| "boom".to_string());
        assert!(state.update_status(id, status, error));
    }

    #[test]
    fn begin_round_requires_pending_items() {
        let mut state = SessionState::new(0);
        assert!(matches!(
            state.begin_round("b1"),
            Err(QueueError::NoPendingItems)
        ));
        assert!(!state.is_running());
    }

    #[test]
    fn begin_round_rejects_second_round() {
        let (mut state, ids) = state_with(&[10, 20]);
        assert_eq!(state.begin_round("b1").unwrap(), ids);
        assert!(matches!(
            state.begin_round("b2"),
            Err(QueueError::RoundInProgress)
        ));
        assert_eq!(state.round_batch_id(), Some("b1"));
    }

    #[test]
    fn items_added_mid_round_are_not_absorbed() {
        let (mut state, ids) = state_with(&[10]);
        state.begin_round("b1").unwrap();
        let late = FileSource::new("/tmp/late.jpg", "late.jpg", "image/jpeg", 5);
        state.insert(UploadItem::new("late".into(), late));
        assert_eq!(state.round_items(), ids.as_slice());
        assert!(!state.is_admissible("b1", "late"));
    }

    #[test]
    fn lifecycle_rejects_invalid_transitions() {
        let (mut state, ids) = state_with(&[10]);
        let id = &ids[0];
        assert!(!state.update_status(id, ItemStatus::Completed, None));
        assert!(!state.update_status(id, ItemStatus::Pending, None));
        assert!(state.update_status(id, ItemStatus::Uploading, None));
        assert!(!state.update_status(id, ItemStatus::Uploading, None));
        assert!(!state.update_status("missing", ItemStatus::Uploading, None));
    }

    #[test]
    fn completed_sets_full_progress() {
        let (mut state, ids) = state_with(&[10]);
        finish(&mut state, &ids[0], ItemStatus::Completed);
        let item = state.item(&ids[0]).unwrap();
        assert_eq!(item.progress, 100);
        assert!(item.error.is_none());
    }

    #[test]
    fn failed_carries_error() {
        let (mut state, ids) = state_with(&[10]);
        finish(&mut state, &ids[0], ItemStatus::Failed);
        assert_eq!(state.item(&ids[0]).unwrap().error.as_deref(), Some("boom"));
    }

    #[test]
    fn progress_is_monotonic_while_uploading() {
        let (mut state, ids) = state_with(&[1000]);
        let id = &ids[0];
        assert!(state.update_progress(id, 10).is_none(), "pending ignores progress");

        state.begin_round("b1").unwrap();
        state.update_status(id, ItemStatus::Uploading, None);
        assert!(state.update_progress(id, 40).is_some());
        assert!(state.update_progress(id, 20).is_none());
        assert_eq!(state.item(id).unwrap().progress, 40);
        assert!(state.update_progress(id, 40).is_some());
        assert_eq!(state.update_progress(id, 250).unwrap().overall_progress, 100.0);
    }

    #[test]
    fn round_progress_sequence() {
        let (mut state, ids) = state_with(&[1000]);
        let id = &ids[0];
        state.begin_round("b1").unwrap();
        state.update_status(id, ItemStatus::Uploading, None);

        let seen: Vec<f64> = [0u8, 50, 100]
            .iter()
            .filter_map(|&p| state.update_progress(id, p))
            .map(|s| s.overall_progress)
            .collect();
        assert_eq!(seen, [0.0, 50.0, 100.0]);

        state.update_status(id, ItemStatus::Completed, None);
        assert_eq!(state.progress().overall_progress, 100.0);
    }

    #[test]
    fn full_success_promotes_and_folds_items() {
        let (mut state, ids) = state_with(&[10, 20, 30]);
        state.begin_round("b1").unwrap();
        for id in &ids {
            finish(&mut state, id, ItemStatus::Completed);
        }
        let (outcome, abandoned) = state.settle_round("b1", Utc::now());

        assert!(outcome.promoted);
        assert_eq!(outcome.succeeded, 3);
        assert!(abandoned.is_empty());
        assert!(state.is_empty());
        let batch = state.history().latest().unwrap();
        assert_eq!(batch.id, "b1");
        let batch_ids: Vec<&str> = batch.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(batch_ids, ids.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(batch.total_bytes(), 60);
    }

    #[test]
    fn partial_failure_keeps_every_item() {
        let (mut state, ids) = state_with(&[1, 1, 1, 1, 1]);
        state.begin_round("b1").unwrap();
        for (n, id) in ids.iter().enumerate() {
            let status = if n == 2 {
                ItemStatus::Failed
            } else {
                ItemStatus::Completed
            };
            finish(&mut state, id, status);
        }
        let (outcome, _) = state.settle_round("b1", Utc::now());

        assert!(!outcome.promoted);
        assert_eq!((outcome.succeeded, outcome.failed), (4, 1));
        assert!(state.history().is_empty());
        assert_eq!(state.len(), 5);
        assert_eq!(state.count(ItemStatus::Completed), 4);
        assert_eq!(state.count(ItemStatus::Failed), 1);
    }

    #[test]
    fn promotion_keeps_pending_items_added_mid_round() {
        let (mut state, ids) = state_with(&[1]);
        state.begin_round("b1").unwrap();
        let late = FileSource::new("/tmp/late.jpg", "late.jpg", "image/jpeg", 5);
        state.insert(UploadItem::new("late".into(), late));
        finish(&mut state, &ids[0], ItemStatus::Completed);

        let (outcome, _) = state.settle_round("b1", Utc::now());
        assert!(outcome.promoted);
        assert_eq!(state.len(), 1);
        assert_eq!(state.item("late").unwrap().status, ItemStatus::Pending);
    }

    #[test]
    fn uploading_items_are_abandoned_at_settlement() {
        let (mut state, ids) = state_with(&[1, 1]);
        state.begin_round("b1").unwrap();
        finish(&mut state, &ids[0], ItemStatus::Completed);
        state.update_status(&ids[1], ItemStatus::Uploading, None);

        let (outcome, abandoned) = state.settle_round("b1", Utc::now());
        assert_eq!(abandoned, vec![ids[1].clone()]);
        assert!(!outcome.promoted);
        let item = state.item(&ids[1]).unwrap();
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.error.as_deref(), Some(ABANDONED_MESSAGE));
    }

    #[test]
    fn removing_round_item_drops_it_from_work_list() {
        let (mut state, ids) = state_with(&[1, 1]);
        state.begin_round("b1").unwrap();
        assert!(state.remove(&ids[1]));
        assert!(!state.is_admissible("b1", &ids[1]));
        finish(&mut state, &ids[0], ItemStatus::Completed);

        let (outcome, _) = state.settle_round("b1", Utc::now());
        assert_eq!(outcome.attempted, 1);
        assert!(outcome.promoted);
    }

    #[test]
    fn round_emptied_by_removal_is_not_promoted() {
        let (mut state, _) = state_with(&[1, 1]);
        state.begin_round("b1").unwrap();
        assert_eq!(state.remove_all(), 2);
        let (outcome, _) = state.settle_round("b1", Utc::now());
        assert!(!outcome.promoted);
        assert!(state.history().is_empty());
        assert!(!state.is_running());
    }

    #[test]
    fn settle_ignores_stale_batch_id() {
        let (mut state, _) = state_with(&[1]);
        state.begin_round("b2").unwrap();
        let (outcome, _) = state.settle_round("b1", Utc::now());
        assert_eq!(outcome.attempted, 0);
        assert!(state.is_running());
    }

    #[test]
    fn retry_resets_only_target() {
        let (mut state, ids) = state_with(&[1, 1]);
        finish(&mut state, &ids[0], ItemStatus::Failed);
        finish(&mut state, &ids[1], ItemStatus::Failed);
        state.set_remote_id(&ids[0], "p0");
        let sibling_before = state.item(&ids[1]).cloned();

        assert!(state.update_status(&ids[0], ItemStatus::Pending, None));
        let item = state.item(&ids[0]).unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.progress, 0);
        assert!(item.error.is_none());
        assert!(item.remote_id.is_none());
        assert_eq!(state.item(&ids[1]).cloned(), sibling_before);
    }

    #[test]
    fn reject_demotes_completed_items_only() {
        let (mut state, ids) = state_with(&[1, 1]);
        finish(&mut state, &ids[0], ItemStatus::Completed);
        assert!(state.reject(&ids[0], "not confirmed".into()));
        assert_eq!(state.item(&ids[0]).unwrap().status, ItemStatus::Failed);
        assert!(!state.reject(&ids[1], "x".into()));
    }

    #[test]
    fn awaiting_confirmation_lists_completed_round_items() {
        let (mut state, ids) = state_with(&[7, 9]);
        state.begin_round("b1").unwrap();
        finish(&mut state, &ids[0], ItemStatus::Completed);
        state.set_remote_id(&ids[0], "p0");
        finish(&mut state, &ids[1], ItemStatus::Failed);
        state.set_remote_id(&ids[1], "p1");

        assert_eq!(
            state.awaiting_confirmation(),
            vec![(ids[0].clone(), "p0".to_string(), 7)]
        );
    }

    #[test]
    fn reset_clears_everything() {
        let (mut state, ids) = state_with(&[1]);
        state.begin_round("b1").unwrap();
        finish(&mut state, &ids[0], ItemStatus::Completed);
        state.settle_round("b1", Utc::now());
        state.insert(UploadItem::new(
            "x".into(),
            FileSource::new("/tmp/x", "x", "image/png", 1),
        ));
        state.begin_round("b2").unwrap();

        state.reset();
        assert!(state.is_empty());
        assert!(state.history().is_empty());
        assert!(!state.is_running());
        assert_eq!(state.progress(), ProgressSnapshot::default());
    }
}
