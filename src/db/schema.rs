use anyhow::Result;
use arrow_array::{ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Arrow schema for the embeddings table: an opaque id and a fixed-size
/// vector column.
pub fn embeddings_schema(dimensions: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimensions,
            ),
            false,
        ),
    ]))
}

/// Convert a single embedding entry to an Arrow RecordBatch.
pub fn embedding_to_batch(id: &str, vector: &[f32]) -> Result<RecordBatch> {
    let dimensions = vector.len() as i32;
    let schema = embeddings_schema(dimensions);

    let ids: ArrayRef = Arc::new(StringArray::from(vec![id]));

    let values = Float32Array::from(vector.to_vec());
    let field = Arc::new(Field::new("item", DataType::Float32, true));
    let vectors: ArrayRef = Arc::new(
        FixedSizeListArray::try_new(field, dimensions, Arc::new(values), None)
            .map_err(|e| anyhow::anyhow!("Failed to create vector array: {}", e))?,
    );

    RecordBatch::try_new(schema, vec![ids, vectors])
        .map_err(|e| anyhow::anyhow!("Failed to create record batch: {}", e))
}
