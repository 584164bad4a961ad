//! Embedder trait for text-to-vector conversion.

use ragway_types::retrieval::RetrievalFailure;

/// Converts text into a fixed-dimension embedding vector.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in ragway-infra.
pub trait Embedder: Send + Sync {
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, RetrievalFailure>> + Send;

    /// The model name used for embeddings (e.g., "text-embedding-3-small").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
