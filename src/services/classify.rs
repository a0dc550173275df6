use super::progress::{CancelFlag, ProgressEvent, ProgressSink};
use super::types::ClassifySummary;
use crate::db::MetadataStore;
use crate::season::SeasonClassifier;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PACE: Duration = Duration::from_millis(50);

/// Service orchestrating the season classification pipeline.
///
/// Walks every fully indexed image in listing order, asks the classifier
/// for a season and upserts the membership. Per-item problems (no label,
/// store hiccup) are logged and counted; only a failure to load the catalog
/// itself ends the batch, with everything classified so far preserved.
pub struct ClassifyService {
    store: Arc<dyn MetadataStore>,
    classifier: Arc<dyn SeasonClassifier>,
    pace: Duration,
}

impl ClassifyService {
    pub fn new(store: Arc<dyn MetadataStore>, classifier: Arc<dyn SeasonClassifier>) -> Self {
        Self {
            store,
            classifier,
            pace: DEFAULT_PACE,
        }
    }

    /// Override the pacing delay between items.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Run one classification pass over the catalog.
    pub async fn run(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<ClassifySummary> {
        match self.run_inner(sink, cancel).await {
            Ok(summary) => {
                sink.emit(ProgressEvent::ClassificationComplete { summary });
                Ok(summary)
            },
            Err(err) => {
                sink.emit(ProgressEvent::Error {
                    message: format!("classification failed: {err:#}"),
                });
                Err(err)
            },
        }
    }

    async fn run_inner(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<ClassifySummary> {
        let targets: Vec<_> = self
            .store
            .list_all()
            .await
            .context("failed to load the catalog")?
            .into_iter()
            .filter(|record| record.is_fully_indexed())
            .collect();
        let total = targets.len();

        sink.emit(ProgressEvent::ClassificationStatus {
            message: format!("{total} images ready for classification"),
        });

        let mut summary = ClassifySummary::default();
        for (i, record) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Classification cancelled after {} of {} images", i, total);
                sink.emit(ProgressEvent::ClassificationStatus {
                    message: "classification cancelled".to_string(),
                });
                break;
            }

            sink.emit(ProgressEvent::ClassificationStatus {
                message: format!("({}/{}) classifying {}", i + 1, total, record.filename),
            });
            summary.examined += 1;

            match self.classifier.classify(Path::new(&record.path)).await {
                Some(season) => {
                    match self.store.add_season_membership(season, record.id).await {
                        Ok(outcome) => {
                            summary.labeled += 1;
                            if outcome.is_new() {
                                tracing::info!(
                                    "Added {} to the {} set",
                                    record.filename,
                                    season
                                );
                            } else {
                                tracing::debug!(
                                    "{} is already in the {} set",
                                    record.filename,
                                    season
                                );
                            }
                        },
                        Err(err) => {
                            summary.failed += 1;
                            tracing::error!(
                                "Failed to record {} membership for {}: {}",
                                season,
                                record.filename,
                                err
                            );
                        },
                    }
                },
                // The classifier logs its own failure cause.
                None => summary.unlabeled += 1,
            }

            if !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
        }

        Ok(summary)
    }
}
