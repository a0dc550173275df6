//! Test utilities for the photo-insight crate.
//!
//! This module provides reusable test doubles for unit and integration
//! testing: deterministic providers, an in-memory vector store and a
//! recording progress sink. Only available with cfg(test) or feature
//! "testing".

use crate::db::{StoreError, VectorStore};
use crate::embedding::EmbeddingProvider;
use crate::season::{Season, SeasonClassifier};
use crate::services::{ProgressEvent, ProgressSink};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Embedding provider that derives a deterministic vector from the path.
pub struct TestEmbedding {
    dimensions: usize,
}

impl TestEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TestEmbedding {
    async fn embed(&self, path: &Path) -> Option<Vec<f32>> {
        let text = path.to_string_lossy();
        let hash = text
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_add(b as u32));
        Some(
            (0..self.dimensions)
                .map(|i| ((hash.wrapping_add(i as u32) % 1000) as f32) / 1000.0)
                .collect(),
        )
    }

    fn model_id(&self) -> &str {
        "test-embedding-model"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Embedding provider that answers `None` for paths containing a marker,
/// delegating everything else to [`TestEmbedding`].
pub struct FlakyEmbedding {
    inner: TestEmbedding,
    fail_marker: String,
}

impl FlakyEmbedding {
    pub fn failing_on(marker: &str, dimensions: usize) -> Self {
        Self {
            inner: TestEmbedding::new(dimensions),
            fail_marker: marker.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FlakyEmbedding {
    async fn embed(&self, path: &Path) -> Option<Vec<f32>> {
        if path.to_string_lossy().contains(&self.fail_marker) {
            return None;
        }
        self.inner.embed(path).await
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// In-memory vector store with the same dimension check as the real one.
///
/// Thread-safe via Mutex, suitable for unit tests.
pub struct TestVectorStore {
    dimensions: usize,
    reject_writes: bool,
    vectors: Mutex<HashMap<String, Vec<f32>>>,
}

impl TestVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            reject_writes: false,
            vectors: Mutex::new(HashMap::new()),
        }
    }

    /// A store whose backend rejects every write, for failure-path tests.
    pub fn failing(dimensions: usize) -> Self {
        Self {
            dimensions,
            reject_writes: true,
            vectors: Mutex::new(HashMap::new()),
        }
    }

    pub fn stored_ids(&self) -> Vec<String> {
        self.vectors.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl VectorStore for TestVectorStore {
    async fn add(&self, vector_id: &str, vector: &[f32]) -> Result<(), StoreError> {
        if self.reject_writes {
            return Err(StoreError::Other(anyhow::anyhow!(
                "vector backend unavailable"
            )));
        }
        if vector.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        self.vectors
            .lock()
            .unwrap()
            .insert(vector_id.to_string(), vector.to_vec());
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.vectors.lock().unwrap().len() as u64)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Classifier that answers from a filename-keyed script; unscripted files
/// get `None`, mirroring a failed or unrecognized inference.
#[derive(Default)]
pub struct ScriptedClassifier {
    script: HashMap<String, Season>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filename: &str, season: Season) -> Self {
        self.script.insert(filename.to_string(), season);
        self
    }
}

#[async_trait::async_trait]
impl SeasonClassifier for ScriptedClassifier {
    async fn classify(&self, path: &Path) -> Option<Season> {
        let filename = path.file_name()?.to_string_lossy().into_owned();
        self.script.get(&filename).copied()
    }
}

/// Sink that records every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embedding_is_deterministic() {
        let provider = TestEmbedding::new(8);
        let a = provider.embed(Path::new("/photos/a.jpg")).await.unwrap();
        let b = provider.embed(Path::new("/photos/a.jpg")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn flaky_embedding_fails_only_on_marker() {
        let provider = FlakyEmbedding::failing_on("bad", 8);
        assert!(provider.embed(Path::new("/photos/bad.jpg")).await.is_none());
        assert!(provider.embed(Path::new("/photos/ok.jpg")).await.is_some());
    }

    #[tokio::test]
    async fn test_vector_store_checks_dimensions() {
        let store = TestVectorStore::new(8);
        assert!(store.add("a", &[0.0; 8]).await.is_ok());
        assert!(matches!(
            store.add("b", &[0.0; 4]).await.unwrap_err(),
            StoreError::DimensionMismatch { .. }
        ));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scripted_classifier_answers_by_filename() {
        let classifier = ScriptedClassifier::new().with("a.jpg", Season::Spring);
        assert_eq!(
            classifier.classify(Path::new("/any/dir/a.jpg")).await,
            Some(Season::Spring)
        );
        assert_eq!(classifier.classify(Path::new("/any/dir/b.jpg")).await, None);
    }
}
