//! Client and queue settings resolved from the command line.

use std::time::Duration;

use rapidupload_protocol::constants::DEFAULT_REQUEST_TIMEOUT;
use rapidupload_queue::{CompletionMode, QueueConfig};
use rapidupload_transfer::{HttpTransferClient, TransferError};

use crate::cli::Cli;

/// Connection settings for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    pub server_url: String,
    pub token: Option<String>,
    /// Applied to each backend call and to the object-store PUT.
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".into(),
            token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl HttpClientConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            server_url: cli.server.clone(),
            token: cli.token.clone(),
            timeout: Duration::from_secs(cli.timeout_secs.max(1)),
        }
    }

    pub fn build(&self) -> Result<HttpTransferClient, TransferError> {
        HttpTransferClient::new(&self.server_url, self.token.clone(), self.timeout)
    }
}

/// Applies command-line overrides on top of the file config.
pub fn apply_overrides(mut config: QueueConfig, cli: &Cli) -> QueueConfig {
    if let Some(limit) = cli.concurrency {
        config.concurrency_limit = limit;
    }
    if cli.batched {
        config.completion_mode = CompletionMode::Batched;
    }
    config
}
