use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A photo known to the catalog.
///
/// Identity is the absolute file path (unique). The embedding reference is
/// the only indexing marker: a record with `vector_id` set is fully indexed,
/// everything else is a partial row eligible for retry on the next pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub path: String,
    pub filename: String,
    /// File size in megabytes, rounded to two decimals.
    pub size_mb: f64,
    /// Filesystem creation time (modification time where creation is
    /// unavailable).
    pub created_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
    /// Opaque id of the vector-store entry, unique when present.
    pub vector_id: Option<String>,
}

impl ImageRecord {
    pub fn is_fully_indexed(&self) -> bool {
        self.vector_id.is_some()
    }
}

/// Outcome counts of one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub discovered: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome counts of one classification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifySummary {
    pub examined: usize,
    pub labeled: usize,
    pub unlabeled: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_indexed_tracks_vector_id() {
        let mut record = ImageRecord {
            id: 1,
            path: "/photos/a.jpg".to_string(),
            filename: "a.jpg".to_string(),
            size_mb: 1.25,
            created_at: Utc::now(),
            indexed_at: Utc::now(),
            vector_id: None,
        };
        assert!(!record.is_fully_indexed());

        record.vector_id = Some("abc123".to_string());
        assert!(record.is_fully_indexed());
    }
}
