use super::{open_stores, ConsoleSink};
use crate::embedding;
use crate::services::{CancelFlag, IngestService};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct IndexArgs {
    /// Directory to scan recursively for photos
    pub directory: PathBuf,
}

pub async fn execute(args: IndexArgs) -> Result<()> {
    if !args.directory.is_dir() {
        return Err(anyhow::anyhow!(
            "invalid directory: {}",
            args.directory.display()
        ));
    }

    let (config, store, vectors) = open_stores().await?;

    // Fatal at startup when the embedding server is unreachable.
    let provider =
        embedding::create_provider(&config.embedding, config.scan.max_image_dimension).await?;

    let cancel = CancelFlag::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let service = IngestService::new(store, vectors, provider)
        .with_pace(Duration::from_millis(config.scan.pace_ms));
    service.run(&args.directory, &ConsoleSink, &cancel).await?;
    Ok(())
}
