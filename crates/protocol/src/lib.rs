//! Wire types for the RapidUpload backend upload API.
//!
//! All payloads are JSON with camelCase field names, matching the
//! backend's DTOs.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{
    BatchCompleteItem, BatchCompleteRequest, BatchCompleteResponse, BatchStatusResponse,
    InitiateUploadRequest, InitiateUploadResponse, UploadCompleteRequest, UploadFailedRequest,
};
pub use types::{PhotoStatus, PhotoStatusDto};
