//! Upload orchestration engine.
//!
//! [`UploadQueue`] owns the session state (active items plus batch
//! history), runs bounded-parallelism upload rounds against a
//! [`TransferClient`](rapidupload_transfer::TransferClient), aggregates
//! byte-weighted progress, and promotes a round into history only when
//! every one of its items completed.

pub mod config;
pub mod error;
pub mod history;
pub mod progress;
mod queue;
mod scheduler;
pub mod state;
pub mod types;

pub use config::{CompletionMode, QueueConfig};
pub use error::QueueError;
pub use history::BatchHistory;
pub use progress::{ProgressSnapshot, format_bytes, format_eta};
pub use queue::UploadQueue;
pub use state::SessionState;
pub use types::{ItemStatus, RoundOutcome, UploadBatch, UploadEvent, UploadItem};
