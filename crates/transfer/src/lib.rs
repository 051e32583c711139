//! Client side of the three-phase upload protocol.
//!
//! A file is uploaded by asking the backend for a presigned destination
//! (`initiate`), streaming the bytes straight to the object store
//! (`transfer`), then confirming with the backend (`complete`, or the bulk
//! `batch_complete` variant). The orchestration core only sees the
//! [`TransferClient`] trait; [`HttpTransferClient`] is the `reqwest`
//! implementation.

mod client;
mod http;
mod progress;
mod source;

pub use client::{ProgressCallback, TransferClient, TransferFuture};
pub use http::HttpTransferClient;
pub use progress::ByteProgress;
pub use source::{FileSource, detect_content_type};

/// Size of the pieces the object-store body is streamed in: 256 KiB.
///
/// Each piece handed to the transport produces one progress callback.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("object store rejected upload: {0}")]
    Storage(u16),

    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
