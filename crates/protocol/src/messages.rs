use serde::{Deserialize, Serialize};

use crate::types::PhotoStatusDto;

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Requests a presigned upload destination for one file.
///
/// `batch_id` groups every file of a round; the backend creates a new
/// batch when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadRequest {
    pub filename: String,
    pub file_size_bytes: u64,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

/// Confirms that the object-store transfer finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompleteRequest {
    pub file_size_bytes: u64,
    #[serde(rename = "eTag", default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
}

/// Reports a transfer failure to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailedRequest {
    pub error_message: String,
}

/// One entry of a bulk completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCompleteItem {
    pub photo_id: String,
    pub file_size_bytes: u64,
    #[serde(rename = "eTag", default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
}

/// Confirms several transfers at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCompleteRequest {
    pub items: Vec<BatchCompleteItem>,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Presigned destination for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadResponse {
    pub photo_id: String,
    pub upload_url: String,
    #[serde(default)]
    pub expires_in_minutes: u32,
    pub batch_id: String,
}

/// Result of a bulk completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCompleteResponse {
    pub status: String,
    pub processed: u32,
    pub total: u32,
}

/// Server-side view of a batch and each of its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusResponse {
    pub batch_id: String,
    pub total_count: u32,
    pub completed_count: u32,
    pub failed_count: u32,
    #[serde(default)]
    pub photos: Vec<PhotoStatusDto>,
}

impl BatchStatusResponse {
    /// Looks up the status entry for a backend item id.
    pub fn photo(&self, photo_id: &str) -> Option<&PhotoStatusDto> {
        self.photos.iter().find(|p| p.id == photo_id)
    }
}
