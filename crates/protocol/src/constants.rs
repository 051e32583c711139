use std::time::Duration;

/// Content type sent when a file's MIME type is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Timeout applied to each backend request and to the object-store PUT.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests a presigned destination for one file.
pub const INITIATE_PATH: &str = "/api/upload/initiate";

/// Confirms several transfers in one request.
pub const BATCH_COMPLETE_PATH: &str = "/api/upload/complete/batch";

/// Confirms a single transfer.
pub fn complete_path(photo_id: &str) -> String {
    format!("/api/upload/complete/{photo_id}")
}

/// Reports a failed transfer.
pub fn failed_path(photo_id: &str) -> String {
    format!("/api/upload/failed/{photo_id}")
}

/// Polls the server-side status of every item in a batch.
pub fn batch_status_path(batch_id: &str) -> String {
    format!("/api/upload/batch/{batch_id}/status")
}
