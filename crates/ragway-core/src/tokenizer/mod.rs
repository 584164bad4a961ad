//! Token counting with per-request encoder leases.
//!
//! A [`TokenEncoder`] turns text into token ids for one model's tokenization
//! scheme. [`TokenCounter`] caches one shared encoder per model and hands out
//! [`EncoderLease`]s; a lease is the request-scoped handle through which all
//! counting for that request happens.

mod counter;

pub use counter::{EncoderLease, TokenCounter};

use std::sync::Arc;

use ragway_types::error::PipelineError;

/// Byte-pair encoder for a single model.
pub trait TokenEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// Loads the encoder for a model id.
///
/// Returns `PipelineError::Configuration` for unknown models. Loading may be
/// expensive; [`TokenCounter`] calls it at most once per model.
pub trait EncoderFactory: Send + Sync {
    fn load(&self, model_id: &str) -> Result<Arc<dyn TokenEncoder>, PipelineError>;
}
