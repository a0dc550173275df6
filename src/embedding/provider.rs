use std::path::Path;

/// Trait for image embedding providers.
///
/// `embed` follows the null-on-failure contract: per-call failures (missing
/// file, decode error, inference failure) are logged by the implementation
/// and reported as `None`, never raised to the caller.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for the image at `path`.
    async fn embed(&self, path: &Path) -> Option<Vec<f32>>;

    /// Get the model identifier
    fn model_id(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;
}
