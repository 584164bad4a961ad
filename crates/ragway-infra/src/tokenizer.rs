//! tiktoken-backed encoders.
//!
//! Special tokens in user text are encoded as ordinary tokens so counts match
//! what the generation service bills.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use ragway_core::tokenizer::{EncoderFactory, TokenEncoder};
use ragway_types::error::PipelineError;

pub struct TiktokenEncoder {
    bpe: CoreBPE,
}

impl TokenEncoder for TiktokenEncoder {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|rank| rank as u32)
            .collect()
    }
}

/// Resolves model ids to their BPE tables (`cl100k_base`, `o200k_base`, ...).
#[derive(Debug, Default, Clone, Copy)]
pub struct TiktokenEncoderFactory;

impl EncoderFactory for TiktokenEncoderFactory {
    fn load(&self, model_id: &str) -> Result<Arc<dyn TokenEncoder>, PipelineError> {
        let bpe = tiktoken_rs::get_bpe_from_model(model_id).map_err(|e| {
            PipelineError::Configuration(format!("no tokenizer for model '{model_id}': {e}"))
        })?;
        tracing::debug!(model_id, "loaded BPE tables");
        Ok(Arc::new(TiktokenEncoder { bpe }))
    }
}
