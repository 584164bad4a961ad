//! BoxEmbedder -- object-safe dynamic dispatch wrapper for Embedder.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ragway_types::retrieval::RetrievalFailure;

use super::embedder::Embedder;

/// Object-safe version of [`Embedder`] with boxed futures.
pub trait EmbedderDyn: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RetrievalFailure>> + Send + 'a>>;

    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;
}

impl<T: Embedder> EmbedderDyn for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RetrievalFailure>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn model_name(&self) -> &str {
        Embedder::model_name(self)
    }

    fn dimension(&self) -> usize {
        Embedder::dimension(self)
    }
}

/// Type-erased embedder.
#[derive(Clone)]
pub struct BoxEmbedder {
    inner: Arc<dyn EmbedderDyn + Send + Sync>,
}

impl BoxEmbedder {
    pub fn new<T: Embedder + 'static>(embedder: T) -> Self {
        Self {
            inner: Arc::new(embedder),
        }
    }

    /// Embed `text`, rejecting vectors of the wrong dimension.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalFailure> {
        let vector = self.inner.embed_boxed(text).await?;
        let expected = self.inner.dimension();
        if vector.len() != expected {
            return Err(RetrievalFailure::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    pub fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    pub fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
