pub mod lance;
pub mod schema;
pub mod sqlite;

pub use lance::LanceVectorStore;
pub use sqlite::SqliteMetadataStore;

use crate::season::Season;
use crate::services::types::ImageRecord;
use std::path::{Path, PathBuf};

/// Errors surfaced by the stores.
///
/// The variants the pipelines match on are typed; everything else travels as
/// a wrapped `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file disappeared between discovery and cataloging.
    #[error("source file vanished: {0}")]
    SourceVanished(PathBuf),

    /// The vector does not match the store's configured dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The record already carries a different embedding reference. Correct
    /// pipeline sequencing never produces this; it guards against it.
    #[error("image {image_id} is already linked to embedding {existing}")]
    EmbeddingRefConflict { image_id: i64, existing: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Other(err.into())
    }
}

/// A row in one of the per-season membership tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonMembership {
    pub id: i64,
    pub season: Season,
    pub image_id: i64,
}

/// Result of an idempotent membership upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipOutcome {
    Inserted(SeasonMembership),
    Existing(SeasonMembership),
}

impl MembershipOutcome {
    pub fn membership(&self) -> &SeasonMembership {
        match self {
            MembershipOutcome::Inserted(m) | MembershipOutcome::Existing(m) => m,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, MembershipOutcome::Inserted(_))
    }
}

/// Relational persistence for image metadata and season membership.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    async fn find_by_path(&self, path: &Path) -> Result<Option<ImageRecord>, StoreError>;

    /// Create a base row for a newly discovered path, deriving filename,
    /// size and timestamps from the filesystem at call time.
    async fn create_base(&self, path: &Path) -> Result<ImageRecord, StoreError>;

    /// Attach the embedding reference to a record. Idempotent when the same
    /// reference is already attached; a different existing reference is a
    /// conflict.
    async fn attach_embedding_ref(
        &self,
        image_id: i64,
        vector_id: &str,
    ) -> Result<ImageRecord, StoreError>;

    /// Every row regardless of indexed state, in stable listing order.
    async fn list_all(&self) -> Result<Vec<ImageRecord>, StoreError>;

    /// Idempotent upsert into a season's membership set. Re-adding an
    /// existing pair returns the existing row rather than erroring.
    async fn add_season_membership(
        &self,
        season: Season,
        image_id: i64,
    ) -> Result<MembershipOutcome, StoreError>;

    /// Paginated read of a season's members, joined against the catalog.
    async fn list_season_members(
        &self,
        season: Season,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ImageRecord>, StoreError>;

    async fn count_images(&self) -> Result<u64, StoreError>;

    async fn count_indexed(&self) -> Result<u64, StoreError>;
}

/// Persistence for embedding vectors keyed by an opaque id.
///
/// Entries are write-once per id; there is no update or delete.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a vector under `vector_id`. Dimension mismatches are rejected
    /// before reaching the backend.
    async fn add(&self, vector_id: &str, vector: &[f32]) -> Result<(), StoreError>;

    /// Total stored vectors, for diagnostics.
    async fn count(&self) -> Result<u64, StoreError>;

    fn dimensions(&self) -> usize;
}
