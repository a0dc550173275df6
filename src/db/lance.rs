use super::{schema, StoreError, VectorStore};
use anyhow::{Context, Result};
use arrow_array::RecordBatchIterator;
use std::path::Path;
use tokio::sync::RwLock;

const TABLE_NAME: &str = "embeddings";

/// LanceDB-backed vector store.
///
/// Vectors are keyed by an opaque id generated at ingestion time; the link
/// back to the catalog row is by value only, so the ingestion pipeline is
/// the sole consistency authority.
pub struct LanceVectorStore {
    uri: String,
    dimensions: usize,
    connection: RwLock<Option<lancedb::Connection>>,
}

impl LanceVectorStore {
    /// Create a new store instance for a local path.
    pub async fn new(uri: &str, dimensions: usize) -> Result<Self> {
        let path = Path::new(uri);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create vector store directory")?;
        }

        Ok(Self {
            uri: uri.to_string(),
            dimensions,
            connection: RwLock::new(None),
        })
    }

    /// Initialize the store, creating the embeddings table if missing.
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.uri)
            .await
            .context("Failed to create vector store directory")?;

        let db = lancedb::connect(&self.uri)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        let table_names = db.table_names().execute().await?;
        if !table_names.contains(&TABLE_NAME.to_string()) {
            let schema = schema::embeddings_schema(self.dimensions as i32);
            db.create_empty_table(TABLE_NAME, schema)
                .execute()
                .await
                .context("Failed to create embeddings table")?;
        }

        *self.connection.write().await = Some(db);
        Ok(())
    }

    /// Get or create a connection
    async fn get_connection(&self) -> Result<lancedb::Connection> {
        let conn = self.connection.read().await;
        if let Some(ref db) = *conn {
            return Ok(db.clone());
        }
        drop(conn);

        let db = lancedb::connect(&self.uri)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        *self.connection.write().await = Some(db.clone());
        Ok(db)
    }
}

#[async_trait::async_trait]
impl VectorStore for LanceVectorStore {
    async fn add(&self, vector_id: &str, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        let db = self.get_connection().await?;
        let table = db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open embeddings table")?;

        let batch = schema::embedding_to_batch(vector_id, vector)?;
        let schema = batch.schema();

        table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .context("Failed to insert embedding")?;

        tracing::debug!("Stored embedding: {}", vector_id);
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let db = self.get_connection().await?;
        let table = db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open embeddings table")?;

        let count = table
            .count_rows(None)
            .await
            .context("Failed to count embeddings")?;
        Ok(count as u64)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
