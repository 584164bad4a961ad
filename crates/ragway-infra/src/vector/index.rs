//! LanceDB-backed similarity index.
//!
//! Searches a collection (table) by cosine distance. Every non-vector column
//! of a hit becomes a payload field; the score is `1 - distance`.

use arrow_array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    RecordBatch, StringArray,
};
use arrow_schema::DataType;
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use serde_json::Value;

use ragway_core::retrieval::index::SimilarityIndex;
use ragway_types::retrieval::{Payload, RetrievalFailure, ScoredPoint, SearchQuery};

use super::lance::LanceVectorStore;

/// Column holding the embedding.
pub const VECTOR_COLUMN: &str = "vector";
/// Column LanceDB adds to search results.
const DISTANCE_COLUMN: &str = "_distance";

pub struct LanceSimilarityIndex {
    store: LanceVectorStore,
}

impl LanceSimilarityIndex {
    pub fn new(store: LanceVectorStore) -> Self {
        Self { store }
    }

    fn batch_to_points(batch: &RecordBatch) -> Vec<ScoredPoint> {
        let distance_col = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
        let schema = batch.schema();

        (0..batch.num_rows())
            .map(|row| {
                let mut payload = Payload::new();
                for (field, column) in schema.fields().iter().zip(batch.columns()) {
                    let name = field.name();
                    if name == VECTOR_COLUMN || name == DISTANCE_COLUMN {
                        continue;
                    }
                    if let Some(value) = cell_value(column.as_ref(), row) {
                        payload.insert(name.clone(), value);
                    }
                }
                let distance = distance_col.map_or(0.0, |d| d.value(row));
                ScoredPoint {
                    score: 1.0 - distance,
                    payload,
                }
            })
            .collect()
    }
}

impl SimilarityIndex for LanceSimilarityIndex {
    async fn search(
        &self,
        collection: &str,
        query: &SearchQuery,
    ) -> Result<Vec<ScoredPoint>, RetrievalFailure> {
        let table = self
            .store
            .open_table(collection)
            .await
            .map_err(|e| RetrievalFailure::Search(format!("failed to open collection: {e}")))?
            .ok_or_else(|| {
                RetrievalFailure::Search(format!("collection '{collection}' does not exist"))
            })?;

        let results = table
            .vector_search(query.vector.as_slice())
            .map_err(|e| RetrievalFailure::Search(format!("vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(query.limit)
            .execute()
            .await
            .map_err(|e| RetrievalFailure::Search(format!("vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RetrievalFailure::Search(format!("failed to collect results: {e}")))?;

        let mut points: Vec<ScoredPoint> = batches.iter().flat_map(Self::batch_to_points).collect();
        points.sort_by(|a, b| b.score.total_cmp(&a.score));
        points.truncate(query.limit);

        tracing::debug!(collection, hits = points.len(), "similarity search complete");
        Ok(points)
    }
}

/// JSON value of one cell. `None` for column types that have no JSON form.
fn cell_value(column: &dyn Array, row: usize) -> Option<Value> {
    if column.is_null(row) {
        return Some(Value::Null);
    }
    let any = column.as_any();
    let value = match column.data_type() {
        DataType::Utf8 => Value::from(any.downcast_ref::<StringArray>()?.value(row)),
        DataType::LargeUtf8 => Value::from(any.downcast_ref::<LargeStringArray>()?.value(row)),
        DataType::Int32 => Value::from(any.downcast_ref::<Int32Array>()?.value(row)),
        DataType::Int64 => Value::from(any.downcast_ref::<Int64Array>()?.value(row)),
        DataType::Float32 => Value::from(any.downcast_ref::<Float32Array>()?.value(row)),
        DataType::Float64 => Value::from(any.downcast_ref::<Float64Array>()?.value(row)),
        DataType::Boolean => Value::from(any.downcast_ref::<BooleanArray>()?.value(row)),
        _ => return None,
    };
    Some(value)
}
