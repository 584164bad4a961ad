//! Model specifications and the model registry.
//!
//! A [`ModelSpec`] carries the numeric limits the budgeter works against.
//! Specs are resolved by id from the [`ModelRegistry`]; a spec sent by a
//! client is only used for its id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the model speaks the chat or the legacy completion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Chat,
    Completion,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Chat => write!(f, "chat"),
            ModelKind::Completion => write!(f, "completion"),
        }
    }
}

/// Immutable description of a generation model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Provider model identifier (e.g., "gpt-4o").
    pub id: String,
    /// Human-readable name.
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: ModelKind,
    /// Maximum tokens the model will produce in one completion.
    pub max_output_tokens: u32,
    /// Maximum combined prompt + completion tokens.
    pub context_limit: u32,
}

fn default_kind() -> ModelKind {
    ModelKind::Chat
}

impl ModelSpec {
    pub fn chat(id: &str, name: &str, context_limit: u32, max_output_tokens: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ModelKind::Chat,
            max_output_tokens,
            context_limit,
        }
    }
}

/// A model reference as sent by a client: either a bare id or a spec object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelRef {
    Id(String),
    Spec { id: String },
}

impl ModelRef {
    pub fn id(&self) -> &str {
        match self {
            ModelRef::Id(id) => id,
            ModelRef::Spec { id } => id,
        }
    }
}

/// Lookup table of known models.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelSpec>) -> Self {
        Self { models }
    }

    /// Built-in OpenAI chat models.
    pub fn builtin() -> Self {
        Self::new(vec![
            ModelSpec::chat("gpt-3.5-turbo", "GPT-3.5", 4_096, 4_096),
            ModelSpec::chat("gpt-3.5-turbo-16k", "GPT-3.5 16K", 16_384, 4_096),
            ModelSpec::chat("gpt-4", "GPT-4", 8_192, 8_192),
            ModelSpec::chat("gpt-4-32k", "GPT-4 32K", 32_768, 8_192),
            ModelSpec::chat("gpt-4o", "GPT-4o", 128_000, 16_384),
            ModelSpec::chat("gpt-4o-mini", "GPT-4o mini", 128_000, 16_384),
        ])
    }

    /// Built-in models with `overrides` layered on top (same id replaces).
    pub fn with_overrides(overrides: &[ModelSpec]) -> Self {
        let mut registry = Self::builtin();
        for spec in overrides {
            match registry.models.iter_mut().find(|m| m.id == spec.id) {
                Some(existing) => *existing = spec.clone(),
                None => registry.models.push(spec.clone()),
            }
        }
        registry
    }

    pub fn get(&self, id: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.id.as_str())
    }
}
