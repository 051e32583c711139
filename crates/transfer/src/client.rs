//! The transfer protocol seam.

use std::future::Future;
use std::pin::Pin;

use rapidupload_protocol::{
    BatchCompleteItem, BatchCompleteResponse, BatchStatusResponse, InitiateUploadRequest,
    InitiateUploadResponse,
};

use crate::TransferError;
use crate::source::FileSource;

/// Boxed future returned by every [`TransferClient`] operation.
pub type TransferFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransferError>> + Send + 'a>>;

/// Callback invoked with the transfer percent (`0..=100`).
///
/// Implementations must only report non-decreasing values.
pub type ProgressCallback = Box<dyn Fn(u8) + Send + Sync>;

/// Abstract client for the backend + object store.
///
/// The CLI uses [`HttpTransferClient`](crate::HttpTransferClient); tests
/// drive the scheduler with in-memory mocks. Each phase enforces its own
/// timeout, which surfaces as an ordinary error.
pub trait TransferClient: Send + Sync {
    /// Requests a presigned destination for one file.
    fn initiate<'a>(
        &'a self,
        request: &'a InitiateUploadRequest,
    ) -> TransferFuture<'a, InitiateUploadResponse>;

    /// Streams the file to `upload_url`, reporting percent progress.
    fn transfer<'a>(
        &'a self,
        upload_url: &'a str,
        source: &'a FileSource,
        on_progress: ProgressCallback,
    ) -> TransferFuture<'a, ()>;

    /// Confirms a finished transfer with the backend.
    fn complete<'a>(&'a self, photo_id: &'a str, size_bytes: u64) -> TransferFuture<'a, ()>;

    /// Tells the backend a transfer failed. Callers treat this as best-effort.
    fn fail<'a>(&'a self, photo_id: &'a str, reason: &'a str) -> TransferFuture<'a, ()>;

    /// Fetches the server-side status of every item in a batch.
    fn batch_status<'a>(&'a self, batch_id: &'a str) -> TransferFuture<'a, BatchStatusResponse>;

    /// Confirms several finished transfers in one request.
    fn batch_complete<'a>(
        &'a self,
        items: &'a [BatchCompleteItem],
    ) -> TransferFuture<'a, BatchCompleteResponse>;
}
