//! `reqwest` implementation of [`TransferClient`].
//!
//! Backend calls carry the bearer token; the object-store PUT goes to a
//! presigned URL and must not.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use rapidupload_protocol::constants::{
    BATCH_COMPLETE_PATH, INITIATE_PATH, batch_status_path, complete_path, failed_path,
};
use rapidupload_protocol::{
    BatchCompleteItem, BatchCompleteRequest, BatchCompleteResponse, BatchStatusResponse,
    InitiateUploadRequest, InitiateUploadResponse, UploadCompleteRequest, UploadFailedRequest,
};

use crate::client::{ProgressCallback, TransferClient, TransferFuture};
use crate::progress::ByteProgress;
use crate::source::FileSource;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// HTTP client for the upload backend and its object store.
pub struct HttpTransferClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    chunk_size: usize,
}

impl HttpTransferClient {
    /// Creates a client for `base_url`.
    ///
    /// `timeout` bounds every request, including the object-store PUT.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransferError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TransferError::InvalidConfig("empty server URL".into()));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            token: token.filter(|t| !t.is_empty()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Overrides the streaming piece size (minimum 1 byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Builds an authenticated request against the backend.
    fn backend(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.http.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn put_object(
        &self,
        upload_url: &str,
        source: &FileSource,
        on_progress: ProgressCallback,
    ) -> Result<(), TransferError> {
        let file = tokio::fs::File::open(&source.path).await?;
        let total = file.metadata().await?.len();
        if total != source.size {
            warn!(
                file = %source.name,
                expected = source.size,
                actual = total,
                "file size changed since it was queued"
            );
        }

        let on_progress: Arc<dyn Fn(u8) + Send + Sync> = Arc::from(on_progress);
        on_progress(0);

        // The file is read lazily, one piece per poll; progress follows each
        // piece handed to the transport.
        let mut tracker = ByteProgress::new(total);
        let report = Arc::clone(&on_progress);
        let body = ReaderStream::with_capacity(file, self.chunk_size).map(move |piece| {
            if let Ok(bytes) = &piece {
                report(tracker.advance(bytes.len() as u64));
            }
            piece
        });

        let resp = self
            .http
            .put(upload_url)
            .header(CONTENT_TYPE, &source.content_type)
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransferError::Storage(status.as_u16()));
        }

        on_progress(100);
        debug!(file = %source.name, bytes = total, "object store upload finished");
        Ok(())
    }
}

/// Maps non-2xx responses to [`TransferError::Api`].
async fn check_status(resp: Response) -> Result<Response, TransferError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TransferError::Api {
        status: status.as_u16(),
        body,
    })
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, TransferError> {
    let resp = check_status(req.send().await?).await?;
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn send_empty(req: RequestBuilder) -> Result<(), TransferError> {
    check_status(req.send().await?).await?;
    Ok(())
}

impl TransferClient for HttpTransferClient {
    fn initiate<'a>(
        &'a self,
        request: &'a InitiateUploadRequest,
    ) -> TransferFuture<'a, InitiateUploadResponse> {
        Box::pin(async move {
            let resp: InitiateUploadResponse =
                send_json(self.backend(Method::POST, INITIATE_PATH).json(request)).await?;
            debug!(
                file = %request.filename,
                photo_id = %resp.photo_id,
                batch = %resp.batch_id,
                "upload initiated"
            );
            Ok(resp)
        })
    }

    fn transfer<'a>(
        &'a self,
        upload_url: &'a str,
        source: &'a FileSource,
        on_progress: ProgressCallback,
    ) -> TransferFuture<'a, ()> {
        Box::pin(self.put_object(upload_url, source, on_progress))
    }

    fn complete<'a>(&'a self, photo_id: &'a str, size_bytes: u64) -> TransferFuture<'a, ()> {
        Box::pin(async move {
            let body = UploadCompleteRequest {
                file_size_bytes: size_bytes,
                e_tag: None,
            };
            send_empty(self.backend(Method::POST, &complete_path(photo_id)).json(&body)).await
        })
    }

    fn fail<'a>(&'a self, photo_id: &'a str, reason: &'a str) -> TransferFuture<'a, ()> {
        Box::pin(async move {
            let body = UploadFailedRequest {
                error_message: reason.to_string(),
            };
            send_empty(self.backend(Method::POST, &failed_path(photo_id)).json(&body)).await
        })
    }

    fn batch_status<'a>(&'a self, batch_id: &'a str) -> TransferFuture<'a, BatchStatusResponse> {
        Box::pin(async move {
            send_json(self.backend(Method::GET, &batch_status_path(batch_id))).await
        })
    }

    fn batch_complete<'a>(
        &'a self,
        items: &'a [BatchCompleteItem],
    ) -> TransferFuture<'a, BatchCompleteResponse> {
        Box::pin(async move {
            let body = BatchCompleteRequest {
                items: items.to_vec(),
            };
            send_json(self.backend(Method::POST, BATCH_COMPLETE_PATH).json(&body)).await
        })
    }
}
