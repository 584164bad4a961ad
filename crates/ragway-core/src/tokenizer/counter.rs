use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use ragway_types::error::PipelineError;

use super::{EncoderFactory, TokenEncoder};

/// Shared token counter with an encoder cache.
///
/// Thread-safe: the cache is a `DashMap` of immutable encoders and the
/// outstanding-lease count is atomic.
pub struct TokenCounter {
    factory: Arc<dyn EncoderFactory>,
    cache: DashMap<String, Arc<dyn TokenEncoder>>,
    outstanding: Arc<AtomicUsize>,
}

impl TokenCounter {
    pub fn new(factory: Arc<dyn EncoderFactory>) -> Self {
        Self {
            factory,
            cache: DashMap::new(),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Acquire a lease on the encoder for `model_id`.
    ///
    /// The lease must be held for the whole request and is released when
    /// dropped.
    pub fn acquire(&self, model_id: &str) -> Result<EncoderLease, PipelineError> {
        let encoder = self.encoder(model_id)?;
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(model_id, "encoder lease acquired");
        Ok(EncoderLease {
            model_id: model_id.to_string(),
            encoder,
            outstanding: Arc::clone(&self.outstanding),
        })
    }

    /// Count tokens in `text` for `model_id` without holding a lease.
    pub fn count(&self, model_id: &str, text: &str) -> Result<usize, PipelineError> {
        Ok(self.encoder(model_id)?.count(text))
    }

    /// Number of leases currently alive.
    pub fn outstanding_leases(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    fn encoder(&self, model_id: &str) -> Result<Arc<dyn TokenEncoder>, PipelineError> {
        if let Some(hit) = self.cache.get(model_id) {
            return Ok(Arc::clone(hit.value()));
        }
        let loaded = self.factory.load(model_id)?;
        let entry = self
            .cache
            .entry(model_id.to_string())
            .or_insert_with(|| loaded);
        Ok(Arc::clone(entry.value()))
    }
}

/// Request-scoped handle to a model's encoder. Released exactly once, on drop.
pub struct EncoderLease {
    model_id: String,
    encoder: Arc<dyn TokenEncoder>,
    outstanding: Arc<AtomicUsize>,
}

impl EncoderLease {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.encoder.encode(text)
    }

    pub fn count(&self, text: &str) -> usize {
        self.encoder.count(text)
    }
}

impl Drop for EncoderLease {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(model_id = %self.model_id, "encoder lease released");
    }
}

impl std::fmt::Debug for EncoderLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderLease")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}
