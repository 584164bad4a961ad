//! LlmProvider trait definition.
//!
//! The generation collaborator: given a prepared request, open a stream of
//! [`StreamEvent`]s. The stream is boxed so it can outlive the borrow of the
//! provider and be moved into the response body.

use std::pin::Pin;

use futures_util::Stream;
use secrecy::SecretString;

use ragway_types::llm::{CompletionRequest, LlmError, StreamEvent};

/// Stream of generation events as returned by [`LlmProvider::stream`].
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for generation backends.
///
/// Implementations live in ragway-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Open a streaming completion.
    ///
    /// `credential` is a caller-supplied API key. When `None` the provider
    /// uses its configured key. Opening the connection is lazy: errors from
    /// the upstream service surface as the first item of the stream.
    fn stream(&self, request: CompletionRequest, credential: Option<SecretString>) -> EventStream;
}
