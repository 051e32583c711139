use serde::{Deserialize, Serialize};

/// Server-side lifecycle of an uploaded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhotoStatus {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

impl PhotoStatus {
    /// Returns `true` once the server will not change the status again.
    pub fn is_terminal(self) -> bool {
        matches!(self, PhotoStatus::Uploaded | PhotoStatus::Failed)
    }
}

/// Status of a single item inside a batch status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoStatusDto {
    pub id: String,
    pub original_filename: String,
    pub status: PhotoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub updated_at: String,
}
