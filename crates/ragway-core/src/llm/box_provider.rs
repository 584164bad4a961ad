//! BoxLlmProvider -- object-safe dynamic dispatch wrapper for LlmProvider.
//!
//! 1. Define an object-safe `LlmProviderDyn` trait
//! 2. Blanket-impl `LlmProviderDyn` for all `T: LlmProvider`
//! 3. `BoxLlmProvider` wraps `Arc<dyn LlmProviderDyn>` and delegates

use std::sync::Arc;

use secrecy::SecretString;

use ragway_types::llm::CompletionRequest;

use super::provider::{EventStream, LlmProvider};

/// Object-safe version of [`LlmProvider`].
pub trait LlmProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn stream_boxed(&self, request: CompletionRequest, credential: Option<SecretString>)
    -> EventStream;
}

impl<T: LlmProvider> LlmProviderDyn for T {
    fn name(&self) -> &str {
        LlmProvider::name(self)
    }

    fn stream_boxed(
        &self,
        request: CompletionRequest,
        credential: Option<SecretString>,
    ) -> EventStream {
        self.stream(request, credential)
    }
}

/// Type-erased generation provider, cheap to clone.
#[derive(Clone)]
pub struct BoxLlmProvider {
    inner: Arc<dyn LlmProviderDyn + Send + Sync>,
}

impl BoxLlmProvider {
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn stream(
        &self,
        request: CompletionRequest,
        credential: Option<SecretString>,
    ) -> EventStream {
        self.inner.stream_boxed(request, credential)
    }
}
