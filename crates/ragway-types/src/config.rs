//! Configuration types for ragway.
//!
//! `AppConfig` represents the top-level `config.toml` that controls the
//! pipeline, the external collaborators, and quota accounting. Every field
//! has a default so an empty file is a valid configuration.
//!
//! API keys are plain strings here and are wrapped in `SecretString` by the
//! components that use them. The sections holding keys do not derive `Debug`.

use std::path::PathBuf;

use serde::Deserialize;

use crate::model::ModelSpec;
use crate::usage::{PartialUsagePolicy, UsagePeriod};

/// System prompt used when a request does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the retrieved \
context when it is relevant to the question and say so when it is not. Respond using markdown.";

/// Top-level configuration, loaded from `{data_dir}/config.toml`.
#[derive(Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    /// Additional or overriding model specs, layered over the built-in registry.
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

/// Prompt construction settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Tokens held back from the prompt for the completion.
    #[serde(default = "default_reserved_completion_tokens")]
    pub reserved_completion_tokens: u32,
    /// Nearest neighbors requested from the similarity index.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Collection (table) searched for grounding documents.
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
}

fn default_reserved_completion_tokens() -> u32 {
    1_000
}

fn default_top_k() -> usize {
    8
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_temperature() -> f64 {
    1.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reserved_completion_tokens: default_reserved_completion_tokens(),
            top_k: default_top_k(),
            collection: default_collection(),
            default_system_prompt: default_system_prompt(),
            default_temperature: default_temperature(),
        }
    }
}

/// Generation service settings (OpenAI-compatible chat completions).
#[derive(Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Server-side key used when a request carries no credential.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Pin every request to this model. Budgeting follows the pinned model.
    #[serde(default)]
    pub model: Option<String>,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: None,
            model: None,
        }
    }
}

/// Embedding service settings (OpenAI-compatible `/embeddings`).
#[derive(Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1_536
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

/// Similarity index location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VectorConfig {
    /// LanceDB directory. Defaults to `{data_dir}/vector_store`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Quota and usage accounting settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageConfig {
    #[serde(default = "default_period")]
    pub period: UsagePeriod,
    /// Per-period token cap for users without an override. `None` = unlimited.
    #[serde(default)]
    pub default_token_limit: Option<u64>,
    #[serde(default)]
    pub partial_policy: PartialUsagePolicy,
    #[serde(default)]
    pub overrides: Vec<QuotaOverride>,
}

fn default_period() -> UsagePeriod {
    UsagePeriod::Monthly
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            default_token_limit: None,
            partial_policy: PartialUsagePolicy::default(),
            overrides: Vec::new(),
        }
    }
}

impl UsageConfig {
    /// Token limit applying to `user_id`, honoring overrides.
    pub fn limit_for(&self, user_id: &str) -> Option<u64> {
        self.overrides
            .iter()
            .find(|o| o.user_id == user_id)
            .map(|o| o.token_limit)
            .unwrap_or(self.default_token_limit)
    }
}

/// Per-user quota override. `token_limit = None` lifts the cap for that user.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaOverride {
    pub user_id: String,
    #[serde(default)]
    pub token_limit: Option<u64>,
}
