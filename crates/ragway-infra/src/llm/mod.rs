//! Generation provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`LlmProvider`]
//! trait defined in `ragway-core` and a factory ([`create_provider`]) that
//! builds it from the `[generation]` configuration section.
//!
//! [`LlmProvider`]: ragway_core::llm::provider::LlmProvider

pub mod openai_compat;

use ragway_core::llm::box_provider::BoxLlmProvider;
use ragway_types::config::GenerationConfig;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from the `[generation]` section.
///
/// A missing server-side key is not an error: requests that carry their own
/// credential still work, and the rest fail with an authentication error.
pub fn create_provider(config: &GenerationConfig) -> BoxLlmProvider {
    let compat = OpenAiCompatConfig::from_generation(config);
    if compat.api_key.is_none() {
        tracing::warn!(
            base_url = %compat.base_url,
            "no generation API key configured; requests must supply their own"
        );
    }
    BoxLlmProvider::new(OpenAiCompatibleProvider::new(compat))
}
