//! RapidUpload command-line uploader.

mod cli;
mod config;
mod report;

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rapidupload_queue::{QueueConfig, UploadEvent, UploadQueue};

use crate::cli::Cli;
use crate::config::{HttpClientConfig, apply_overrides};
use crate::report::Reporter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let queue_config = apply_overrides(QueueConfig::load(&cli.config)?, &cli);
    queue_config.validate()?;
    let http = HttpClientConfig::from_cli(&cli);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %http.server_url,
        concurrency = queue_config.concurrency_limit,
        "starting upload"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, http, queue_config))
}

async fn run(cli: Cli, http: HttpClientConfig, config: QueueConfig) -> anyhow::Result<()> {
    let client = Arc::new(http.build()?);
    let queue = UploadQueue::new(client, config)?;

    let mut names = HashMap::new();
    for path in &cli.files {
        match queue.add_path(path) {
            Ok(id) => {
                let name = queue
                    .item(&id)
                    .map_or_else(|| path.display().to_string(), |i| i.source.name);
                names.insert(id, name);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping file"),
        }
    }
    if names.is_empty() {
        anyhow::bail!("no readable files to upload");
    }

    let mut events = queue
        .take_events()
        .ok_or_else(|| anyhow::anyhow!("event stream already taken"))?;
    let printer = tokio::spawn(async move {
        let mut reporter = Reporter::new(names);
        while let Some(event) = events.recv().await {
            if let Some(line) = reporter.line(&event) {
                println!("{line}");
            }
            if matches!(event, UploadEvent::RoundSettled { .. }) {
                break;
            }
        }
    });

    let outcome = queue.run().await?;
    // Closes the event channel if the settle event was dropped.
    drop(queue);
    printer.await?;

    if outcome.failed > 0 {
        anyhow::bail!("{} upload(s) failed", outcome.failed);
    }
    Ok(())
}
