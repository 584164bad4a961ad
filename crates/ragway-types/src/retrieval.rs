//! Retrieval types: similarity queries and their scored results.

use serde::{Deserialize, Serialize};

/// Arbitrary document fields stored alongside a vector.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A nearest-neighbor query against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
}

/// One hit from a similarity search. Higher score is more relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub score: f32,
    pub payload: Payload,
}

/// Errors from the embedding or similarity-search collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalFailure {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("similarity search failed: {0}")]
    Search(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
