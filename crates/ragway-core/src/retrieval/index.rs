//! Similarity index trait.

use ragway_types::retrieval::{RetrievalFailure, ScoredPoint, SearchQuery};

/// Nearest-neighbor search over named collections.
///
/// Results are ordered by descending score. Implementations live in
/// ragway-infra (e.g., `LanceSimilarityIndex`).
pub trait SimilarityIndex: Send + Sync {
    fn search(
        &self,
        collection: &str,
        query: &SearchQuery,
    ) -> impl std::future::Future<Output = Result<Vec<ScoredPoint>, RetrievalFailure>> + Send;
}
