//! Bounded-parallelism upload rounds.
//!
//! A round captures the pending items, admits them in order as semaphore
//! permits free up, runs each item's initiate/transfer/complete exchange in
//! its own task, and settles once the task set is drained.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use rapidupload_protocol::{BatchCompleteItem, InitiateUploadRequest, PhotoStatus};
use rapidupload_transfer::{FileSource, TransferError};

use crate::config::CompletionMode;
use crate::error::QueueError;
use crate::queue::UploadQueue;
use crate::types::{ItemStatus, RoundOutcome, UploadEvent};

const NOT_CONFIRMED_MESSAGE: &str = "not confirmed by server";

impl UploadQueue {
    /// Uploads every item pending at call time and waits for the round to
    /// settle.
    ///
    /// Item failures are recorded on the items; the returned error only
    /// covers rounds that cannot start.
    pub async fn run(&self) -> Result<RoundOutcome, QueueError> {
        let batch_id = uuid::Uuid::new_v4().to_string();

        let mut begun = Err(QueueError::NoPendingItems);
        self.inner.state.send_if_modified(|s| {
            begun = s.begin_round(&batch_id);
            begun.is_ok()
        });
        let work_list = begun?;

        let limit = self.inner.config.concurrency_limit;
        info!(
            batch = %batch_id,
            items = work_list.len(),
            concurrency = limit,
            "upload round started"
        );
        self.emit(UploadEvent::RoundStarted {
            batch_id: batch_id.clone(),
            items: work_list.len(),
        });

        let slots = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();

        for item_id in work_list {
            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };

            let Some(source) = self.admit(&batch_id, &item_id) else {
                continue;
            };

            let queue = self.clone();
            let batch_id = batch_id.clone();
            tasks.spawn(async move {
                queue.upload_item(item_id, source, batch_id).await;
                drop(permit);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(batch = %batch_id, error = %e, "upload task aborted");
            }
        }

        if self.inner.config.completion_mode == CompletionMode::Batched {
            self.confirm_batch(&batch_id).await;
        }

        let mut settled = None;
        self.inner.state.send_modify(|s| {
            settled = Some(s.settle_round(&batch_id, Utc::now()));
        });
        let (outcome, abandoned) = settled.unwrap_or_default();
        for id in &abandoned {
            self.emit_failed(id);
        }

        info!(
            batch = %batch_id,
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            promoted = outcome.promoted,
            "upload round settled"
        );
        self.emit(UploadEvent::RoundSettled {
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Marks a work-list item uploading if it is still pending in this round.
    fn admit(&self, batch_id: &str, item_id: &str) -> Option<FileSource> {
        let source = {
            let state = self.inner.state.borrow();
            if !state.is_admissible(batch_id, item_id) {
                debug!(item = %item_id, "skipping item no longer pending");
                return None;
            }
            state.item(item_id).map(|i| i.source.clone())
        }?;

        self.update_status(item_id, ItemStatus::Uploading, None)
            .then_some(source)
    }

    async fn upload_item(&self, item_id: String, source: FileSource, batch_id: String) {
        let mut remote_id = None;

        match self
            .exchange(&item_id, &source, &batch_id, &mut remote_id)
            .await
        {
            Ok(()) => {
                self.update_status(&item_id, ItemStatus::Completed, None);
                debug!(item = %item_id, file = %source.name, "upload completed");
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(item = %item_id, file = %source.name, error = %reason, "upload failed");
                self.update_status(&item_id, ItemStatus::Failed, Some(reason.clone()));

                if let Some(remote_id) = remote_id {
                    if let Err(e) = self.inner.client.fail(&remote_id, &reason).await {
                        warn!(item = %item_id, error = %e, "failure notification not delivered");
                    }
                }
            }
        }
    }

    /// Runs the initiate, transfer and (per-item mode) complete phases.
    async fn exchange(
        &self,
        item_id: &str,
        source: &FileSource,
        batch_id: &str,
        remote_id: &mut Option<String>,
    ) -> Result<(), TransferError> {
        let client = &self.inner.client;

        let request = InitiateUploadRequest {
            filename: source.name.clone(),
            file_size_bytes: source.size,
            content_type: source.content_type.clone(),
            batch_id: Some(batch_id.to_string()),
        };
        let destination = client.initiate(&request).await?;
        *remote_id = Some(destination.photo_id.clone());
        self.inner
            .state
            .send_if_modified(|s| s.set_remote_id(item_id, &destination.photo_id));
        debug!(item = %item_id, photo_id = %destination.photo_id, "destination acquired");

        let queue = self.clone();
        let progress_id = item_id.to_string();
        client
            .transfer(
                &destination.upload_url,
                source,
                Box::new(move |percent| {
                    queue.update_progress(&progress_id, percent);
                }),
            )
            .await?;

        if self.inner.config.completion_mode == CompletionMode::PerItem {
            client.complete(&destination.photo_id, source.size).await?;
        }
        Ok(())
    }

    /// Confirms the round's transferred items in bulk and fails every item
    /// the server does not report as uploaded.
    async fn confirm_batch(&self, batch_id: &str) {
        let awaiting = self.inner.state.borrow().awaiting_confirmation();
        if awaiting.is_empty() {
            return;
        }

        let entries: Vec<BatchCompleteItem> = awaiting
            .iter()
            .map(|(_, photo_id, size)| BatchCompleteItem {
                photo_id: photo_id.clone(),
                file_size_bytes: *size,
                e_tag: None,
            })
            .collect();

        let client = &self.inner.client;
        let status = match client.batch_complete(&entries).await {
            Ok(resp) => {
                debug!(
                    batch = %batch_id,
                    processed = resp.processed,
                    total = resp.total,
                    "batch confirmation sent"
                );
                client.batch_status(batch_id).await
            }
            Err(e) => Err(e),
        };

        for (item_id, photo_id, _) in awaiting {
            let rejection = match &status {
                Ok(report) => match report.photo(&photo_id) {
                    Some(dto) if dto.status == PhotoStatus::Uploaded => None,
                    Some(dto) if dto.status == PhotoStatus::Failed => Some(
                        dto.error_message
                            .clone()
                            .unwrap_or_else(|| "rejected by server".into()),
                    ),
                    _ => Some(NOT_CONFIRMED_MESSAGE.to_string()),
                },
                Err(e) => Some(e.to_string()),
            };

            if let Some(reason) = rejection {
                warn!(
                    item = %item_id,
                    photo_id = %photo_id,
                    error = %reason,
                    "server did not confirm upload"
                );
                let rejected = self
                    .inner
                    .state
                    .send_if_modified(|s| s.reject(&item_id, reason));
                if rejected {
                    self.emit_failed(&item_id);
                }
            }
        }
    }
}
