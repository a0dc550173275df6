use super::progress::{CancelFlag, ProgressEvent, ProgressSink};
use super::types::{ImageRecord, IngestSummary};
use crate::db::{MetadataStore, StoreError, VectorStore};
use crate::embedding::EmbeddingProvider;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

/// Accepted image extensions, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

const DEFAULT_PACE: Duration = Duration::from_millis(50);

/// Generate a fresh opaque embedding reference.
pub fn generate_vector_id() -> String {
    nanoid::nanoid!()
}

/// Per-file terminal state of one ingestion step.
enum FileOutcome {
    Indexed(ImageRecord),
    Skipped,
    Failed,
}

/// Service orchestrating the ingestion pipeline.
///
/// Drives every candidate file through
/// discovered -> meta-created -> embedded -> done, with per-item failures
/// logged and skipped so a single bad file never aborts the batch. A row is
/// only marked fully indexed after its vector write succeeds, which keeps
/// the two stores consistent and every partial row retryable on the next
/// pass.
pub struct IngestService {
    store: Arc<dyn MetadataStore>,
    vectors: Arc<dyn VectorStore>,
    embedding: Arc<dyn EmbeddingProvider>,
    pace: Duration,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        vectors: Arc<dyn VectorStore>,
        embedding: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            store,
            vectors,
            embedding,
            pace: DEFAULT_PACE,
        }
    }

    /// Override the pacing delay between items. The delay keeps event
    /// bursts off the progress transport and is not a correctness
    /// requirement.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Run one ingestion pass over `root`.
    ///
    /// Batch-level errors are reported through the sink's `Error` event and
    /// returned; the stores are left consistent and the pass safe to
    /// resume.
    pub async fn run(
        &self,
        root: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<IngestSummary> {
        match self.run_inner(root, sink, cancel).await {
            Ok(summary) => {
                sink.emit(ProgressEvent::IndexingComplete { summary });
                Ok(summary)
            },
            Err(err) => {
                sink.emit(ProgressEvent::Error {
                    message: format!("indexing failed: {err:#}"),
                });
                Err(err)
            },
        }
    }

    async fn run_inner(
        &self,
        root: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<IngestSummary> {
        sink.emit(ProgressEvent::IndexingStatus {
            message: format!("scanning {}", root.display()),
        });

        let files = discover_images(root)?;
        let total = files.len();
        let mut summary = IngestSummary {
            discovered: total,
            ..Default::default()
        };

        sink.emit(ProgressEvent::IndexingStatus {
            message: format!("found {total} images, starting to process"),
        });

        for (i, path) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Ingestion cancelled after {} of {} files", i, total);
                sink.emit(ProgressEvent::IndexingStatus {
                    message: "indexing cancelled".to_string(),
                });
                break;
            }

            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            sink.emit(ProgressEvent::IndexingStatus {
                message: format!("({}/{}) processing {}", i + 1, total, filename),
            });

            match self.index_file(path).await {
                FileOutcome::Indexed(record) => {
                    summary.indexed += 1;
                    tracing::info!("Indexed new image: {}", record.path);
                    sink.emit(ProgressEvent::NewImageFound {
                        path: record.path,
                        status: "Indexed".to_string(),
                    });
                },
                FileOutcome::Skipped => summary.skipped += 1,
                FileOutcome::Failed => summary.failed += 1,
            }

            if !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
        }

        Ok(summary)
    }

    /// Drive a single file through the per-item state machine. Never
    /// returns an error: every failure is logged and folded into the
    /// outcome.
    async fn index_file(&self, path: &Path) -> FileOutcome {
        let record = match self.store.find_by_path(path).await {
            Ok(Some(existing)) if existing.is_fully_indexed() => {
                tracing::debug!("Already fully indexed, skipping {}", path.display());
                return FileOutcome::Skipped;
            },
            // A row without an embedding reference was left by an earlier
            // failed pass; reuse it and retry the embedding.
            Ok(Some(partial)) => partial,
            Ok(None) => match self.store.create_base(path).await {
                Ok(created) => created,
                Err(StoreError::SourceVanished(gone)) => {
                    tracing::warn!(
                        "File vanished before it could be cataloged: {}",
                        gone.display()
                    );
                    return FileOutcome::Failed;
                },
                Err(err) => {
                    tracing::error!(
                        "Failed to create catalog row for {}: {}",
                        path.display(),
                        err
                    );
                    return FileOutcome::Failed;
                },
            },
            Err(err) => {
                tracing::error!("Catalog lookup failed for {}: {}", path.display(), err);
                return FileOutcome::Failed;
            },
        };

        // The provider logs its own failure cause; the row stays retryable.
        let Some(vector) = self.embedding.embed(path).await else {
            return FileOutcome::Failed;
        };

        let vector_id = generate_vector_id();
        if let Err(err) = self.vectors.add(&vector_id, &vector).await {
            // Not attaching the reference leaves the row retryable.
            tracing::error!("Vector write failed for {}: {}", path.display(), err);
            return FileOutcome::Failed;
        }

        match self.store.attach_embedding_ref(record.id, &vector_id).await {
            Ok(updated) => FileOutcome::Indexed(updated),
            Err(err) => {
                tracing::error!(
                    "Failed to attach embedding reference for {}: {}",
                    path.display(),
                    err
                );
                FileOutcome::Failed
            },
        }
    }
}

/// Recursively collect supported image files under `root`, sorted by file
/// name for a stable discovery order.
pub fn discover_images(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("failed to read directory under {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_supported_extension(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
