pub mod clip;
pub mod provider;

pub use provider::EmbeddingProvider;

use crate::services::config::EmbeddingConfig;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Create the embedding provider from configuration and verify it is
/// reachable.
///
/// This is the one fatal-at-startup dependency: a pipeline run must not
/// start when embeddings cannot be produced.
pub async fn create_provider(
    config: &EmbeddingConfig,
    max_image_dimension: u32,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = clip::ClipServerEmbedding::new(
        &config.model,
        &config.base_url,
        config.dimensions,
        max_image_dimension,
    );
    provider
        .ensure_available()
        .await
        .context("Failed to initialize embedding provider")?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_provider_fails_when_server_is_down() {
        let config = EmbeddingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "clip-vit-base-patch32".to_string(),
            dimensions: 512,
        };
        let result = create_provider(&config, 1024).await;
        assert!(result.is_err());
    }
}
