//! Queue error types.

/// Errors returned by queue operations.
///
/// Per-item transfer failures are recorded on the item, not returned here.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("no files to upload")]
    NoPendingItems,

    #[error("an upload round is already running")]
    RoundInProgress,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] rapidupload_transfer::TransferError),
}
