use std::path::{Path, PathBuf};

use rapidupload_protocol::constants::DEFAULT_CONTENT_TYPE;

use crate::TransferError;

/// A local file payload plus the metadata the protocol needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    /// Location of the payload on disk.
    pub path: PathBuf,
    /// File name reported to the backend.
    pub name: String,
    /// MIME type sent with `initiate` and the object-store PUT.
    pub content_type: String,
    /// Size in bytes, fixed when the source is created.
    pub size: u64,
}

impl FileSource {
    /// Creates a source from already-known metadata.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            content_type: content_type.into(),
            size,
        }
    }

    /// Builds a source by reading file metadata from disk.
    ///
    /// The MIME type is derived from the extension, falling back to
    /// `application/octet-stream`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TransferError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(TransferError::InvalidSource(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                TransferError::InvalidSource(format!("invalid file name: {}", path.display()))
            })?
            .to_string();

        let content_type = detect_content_type(&name).unwrap_or(DEFAULT_CONTENT_TYPE);

        Ok(Self {
            path: path.to_path_buf(),
            name,
            content_type: content_type.to_string(),
            size: metadata.len(),
        })
    }
}

/// Guesses an image MIME type from a file name's extension.
pub fn detect_content_type(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("png") => Some("image/png"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        Some("heic") => Some("image/heic"),
        Some("heif") => Some("image/heif"),
        Some("bmp") => Some("image/bmp"),
        Some("tif" | "tiff") => Some("image/tiff"),
        Some("svg") => Some("image/svg+xml"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_content_type_known() {
        assert_eq!(detect_content_type("photo.jpg"), Some("image/jpeg"));
        assert_eq!(detect_content_type("photo.jpeg"), Some("image/jpeg"));
        assert_eq!(detect_content_type("shot.png"), Some("image/png"));
        assert_eq!(detect_content_type("iphone.heic"), Some("image/heic"));
        assert_eq!(detect_content_type("scan.tif"), Some("image/tiff"));
    }

    #[test]
    fn detect_content_type_unknown() {
        assert_eq!(detect_content_type("notes.txt"), None);
        assert_eq!(detect_content_type("noext"), None);
        assert_eq!(detect_content_type(""), None);
    }

    #[test]
    fn detect_content_type_case_insensitive() {
        assert_eq!(detect_content_type("IMG_0001.JPG"), Some("image/jpeg"));
        assert_eq!(detect_content_type("Logo.PNG"), Some("image/png"));
    }

    #[test]
    fn from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beach.jpg");
        std::fs::write(&path, vec![0u8; 1500]).unwrap();

        let source = FileSource::from_path(&path).unwrap();
        assert_eq!(source.name, "beach.jpg");
        assert_eq!(source.content_type, "image/jpeg");
        assert_eq!(source.size, 1500);
        assert_eq!(source.path, path);
    }

    #[test]
    fn from_path_unknown_extension_uses_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.cr2");
        std::fs::write(&path, b"x").unwrap();

        let source = FileSource::from_path(&path).unwrap();
        assert_eq!(source.content_type, "application/octet-stream");
    }

    #[test]
    fn from_path_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::from_path(dir.path()).unwrap_err();
        assert!(matches!(err, TransferError::InvalidSource(_)));
    }

    #[test]
    fn from_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::from_path(dir.path().join("gone.jpg")).unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));
    }
}
