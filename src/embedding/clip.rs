use super::provider::EmbeddingProvider;
use crate::codec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    /// Base64 JPEG of the codec-adapted image.
    image: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a local CLIP-style image embedding server.
pub struct ClipServerEmbedding {
    model_id: String,
    base_url: String,
    dimensions: usize,
    max_image_dimension: u32,
    client: reqwest::Client,
}

impl ClipServerEmbedding {
    pub fn new(
        model_id: &str,
        base_url: &str,
        dimensions: usize,
        max_image_dimension: u32,
    ) -> Self {
        Self {
            model_id: model_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            dimensions,
            max_image_dimension,
            client: reqwest::Client::new(),
        }
    }

    /// Verify the embedding server is reachable.
    ///
    /// Nothing downstream can function without embeddings, so callers treat
    /// a failure here as fatal at startup.
    pub async fn ensure_available(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await.with_context(|| {
            format!("embedding server unreachable at {}", self.base_url)
        })?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "embedding server health check failed with status {}",
                response.status()
            ));
        }
        Ok(())
    }

    async fn try_embed(&self, path: &Path) -> Result<Vec<f32>> {
        // The decode/re-encode is CPU-bound; keep it off the async runtime
        // so progress events stay responsive.
        let owned = path.to_path_buf();
        let max_dim = self.max_image_dimension;
        let encoded = tokio::task::spawn_blocking(move || {
            codec::encode_for_transport(&owned, max_dim)
        })
        .await
        .context("image encoding task failed")?
        .ok_or_else(|| anyhow::anyhow!("image could not be decoded"))?;

        let request = EmbedRequest {
            model: self.model_id.clone(),
            image: encoded.to_base64(),
        };

        let url = format!("{}/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("failed to send embedding request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "embedding server error {}: {}",
                status,
                body
            ));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .context("failed to parse embedding response")?;
        Ok(result.embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ClipServerEmbedding {
    async fn embed(&self, path: &Path) -> Option<Vec<f32>> {
        match self.try_embed(path).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                tracing::error!("Failed to embed {}: {:#}", path.display(), err);
                None
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
