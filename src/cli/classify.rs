use super::{open_stores, ConsoleSink};
use crate::season::VlmSeasonClassifier;
use crate::services::{CancelFlag, ClassifyService};
use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args)]
pub struct ClassifyArgs {}

pub async fn execute(_args: ClassifyArgs) -> Result<()> {
    let (config, store, _vectors) = open_stores().await?;

    let classifier = Arc::new(VlmSeasonClassifier::new(
        &config.classifier.model,
        &config.classifier.base_url,
        Duration::from_secs(config.classifier.timeout_secs),
        config.scan.max_image_dimension,
    )?);

    let cancel = CancelFlag::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let service = ClassifyService::new(store, classifier)
        .with_pace(Duration::from_millis(config.scan.pace_ms));
    service.run(&ConsoleSink, &cancel).await?;
    Ok(())
}
