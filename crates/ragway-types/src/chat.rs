//! Inbound chat request body.

use serde::Deserialize;

use crate::llm::Message;
use crate::model::ModelRef;

/// Body of `POST /api/v1/chat`.
///
/// `key` is an optional per-request credential for the generation service.
/// It is never logged; [`ChatRequest`] does not derive `Debug`.
#[derive(Clone, Deserialize)]
pub struct ChatRequest {
    pub model: ModelRef,
    pub messages: Vec<Message>,
    /// System prompt. Falls back to the configured default when absent.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub key: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: ModelRef::Id(model.into()),
            messages,
            prompt: None,
            temperature: None,
            key: None,
        }
    }

    /// Per-request credential, ignoring empty strings.
    pub fn credential(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}
