//! BoxSimilarityIndex -- object-safe dynamic dispatch wrapper for SimilarityIndex.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ragway_types::retrieval::{RetrievalFailure, ScoredPoint, SearchQuery};

use super::index::SimilarityIndex;

pub trait SimilarityIndexDyn: Send + Sync {
    fn search_boxed<'a>(
        &'a self,
        collection: &'a str,
        query: &'a SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPoint>, RetrievalFailure>> + Send + 'a>>;
}

impl<T: SimilarityIndex> SimilarityIndexDyn for T {
    fn search_boxed<'a>(
        &'a self,
        collection: &'a str,
        query: &'a SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPoint>, RetrievalFailure>> + Send + 'a>>
    {
        Box::pin(self.search(collection, query))
    }
}

/// Type-erased similarity index.
#[derive(Clone)]
pub struct BoxSimilarityIndex {
    inner: Arc<dyn SimilarityIndexDyn + Send + Sync>,
}

impl BoxSimilarityIndex {
    pub fn new<T: SimilarityIndex + 'static>(index: T) -> Self {
        Self {
            inner: Arc::new(index),
        }
    }

    pub async fn search(
        &self,
        collection: &str,
        query: &SearchQuery,
    ) -> Result<Vec<ScoredPoint>, RetrievalFailure> {
        self.inner.search_boxed(collection, query).await
    }
}
