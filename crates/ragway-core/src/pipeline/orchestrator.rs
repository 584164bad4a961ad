use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use secrecy::SecretString;
use tracing::{Instrument, debug, error, info, info_span, trace};

use ragway_types::chat::ChatRequest;
use ragway_types::error::PipelineError;
use ragway_types::llm::{CompletionRequest, LlmError, StreamEvent};
use ragway_types::model::{ModelRegistry, ModelSpec};
use ragway_types::usage::PartialUsagePolicy;

use super::session::StreamSession;
use super::span::StreamInSpan;
use crate::budget::{PromptBudgeter, max_completion_tokens, message_cost, system_cost};
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::provider::EventStream;
use crate::retrieval::RetrievalAugmenter;
use crate::tokenizer::TokenCounter;
use crate::usage::box_ledger::BoxUsageLedger;

/// Response body chunks. An `Err` is always the last item and means the
/// upstream failed after headers were sent.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<String, PipelineError>> + Send + 'static>>;

/// Request-independent pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_system_prompt: String,
    pub default_temperature: f64,
    /// Pins generation (and budgeting) to this model regardless of the request.
    pub generation_model: Option<String>,
    pub partial_policy: PartialUsagePolicy,
}

/// Sequences quota, budgeting, retrieval, and generation for one chat request.
#[derive(Clone)]
pub struct ChatPipeline {
    registry: Arc<ModelRegistry>,
    counter: Arc<TokenCounter>,
    budgeter: PromptBudgeter,
    augmenter: RetrievalAugmenter,
    provider: BoxLlmProvider,
    ledger: BoxUsageLedger,
    settings: PipelineSettings,
}

impl ChatPipeline {
    pub fn new(
        registry: Arc<ModelRegistry>,
        counter: Arc<TokenCounter>,
        budgeter: PromptBudgeter,
        augmenter: RetrievalAugmenter,
        provider: BoxLlmProvider,
        ledger: BoxUsageLedger,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            counter,
            budgeter,
            augmenter,
            provider,
            ledger,
            settings,
        }
    }

    pub fn ledger(&self) -> &BoxUsageLedger {
        &self.ledger
    }

    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    /// Run every step up to the first generated chunk.
    ///
    /// Any error returned here happens before response headers are sent.
    /// Usage is only recorded once the returned completion is streamed.
    pub async fn prepare(
        &self,
        user_id: &str,
        request: ChatRequest,
    ) -> Result<PreparedCompletion, PipelineError> {
        if request.messages.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "messages must contain at least one message".to_string(),
            ));
        }

        let requested_model_id = request.model.id().to_string();
        let model_id = self
            .settings
            .generation_model
            .clone()
            .unwrap_or_else(|| requested_model_id.clone());

        // Quota gate runs before any tokenization.
        self.ledger
            .check_quota(user_id, &model_id)
            .await
            .map_err(|e| PipelineError::from_quota(user_id, e))?;

        let model = self.resolve_model(&model_id)?;
        if model_id != requested_model_id {
            debug!(
                requested_model = %requested_model_id,
                model = %model.id,
                "generation model pinned by configuration"
            );
        }

        let lease = self.counter.acquire(&model.id)?;
        let system_prompt = request
            .prompt
            .clone()
            .unwrap_or_else(|| self.settings.default_system_prompt.clone());

        let budgeted = self
            .budgeter
            .build(&lease, &model, &system_prompt, &request.messages)?;
        if budgeted.is_empty() {
            return Err(self.prompt_too_large(&model));
        }

        let allowance = self
            .budgeter
            .message_allowance(&lease, &model, &system_prompt)?;
        let augmentation = self
            .augmenter
            .augment_within(&budgeted.messages, &lease, allowance)
            .await?;

        let prompt_tokens = system_cost(&lease, &system_prompt)
            + augmentation
                .messages
                .iter()
                .map(|m| message_cost(&lease, m))
                .sum::<usize>();
        if prompt_tokens + self.budgeter.reserved_completion_tokens() as usize
            > model.context_limit as usize
        {
            return Err(self.prompt_too_large(&model));
        }
        let max_tokens = max_completion_tokens(&model, prompt_tokens);

        let completion = CompletionRequest {
            model: model.id.clone(),
            messages: augmentation.messages,
            system: (!system_prompt.is_empty()).then_some(system_prompt),
            max_tokens,
            temperature: Some(
                request
                    .temperature
                    .unwrap_or(self.settings.default_temperature),
            ),
            stream: true,
        };
        let credential = request
            .credential()
            .map(|key| SecretString::from(key.to_string()));

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %completion.model,
            gen_ai.request.max_tokens = completion.max_tokens,
            gen_ai.request.temperature = ?completion.temperature,
            gen_ai.request.stream = true,
            user_id = %user_id,
            prompt_tokens,
            retrieval.results = augmentation.results.len(),
        );

        let started = Instant::now();
        let mut upstream = self.provider.stream(completion, credential);
        let opening = open(&mut upstream).instrument(span.clone()).await?;
        span.in_scope(|| {
            info!(
                time_to_first_chunk_ms = started.elapsed().as_millis() as u64,
                "generation stream opened"
            )
        });

        let session = StreamSession::new(
            lease,
            self.ledger.clone(),
            self.settings.partial_policy,
            user_id,
            u32::try_from(prompt_tokens).unwrap_or(u32::MAX),
        );

        Ok(PreparedCompletion {
            requested_model_id,
            model,
            prompt_tokens,
            max_completion_tokens: max_tokens,
            retrieval_results: augmentation.results.len(),
            replaced_history: augmentation.replaced_history,
            dropped_messages: budgeted.dropped + augmentation.trimmed_history,
            opening,
            upstream,
            session,
            span,
        })
    }

    fn resolve_model(&self, model_id: &str) -> Result<ModelSpec, PipelineError> {
        self.registry.get(model_id).cloned().ok_or_else(|| {
            PipelineError::Configuration(format!("unknown model '{model_id}'"))
        })
    }

    fn prompt_too_large(&self, model: &ModelSpec) -> PipelineError {
        PipelineError::PromptTooLarge {
            model_id: model.id.clone(),
            context_limit: model.context_limit,
            reserved: self.budgeter.reserved_completion_tokens(),
        }
    }
}

/// What the upstream produced before the first chunk could be forwarded.
enum Opening {
    Text(String),
    Finished,
}

/// Poll the upstream until it produces text, finishes, or fails.
async fn open(upstream: &mut EventStream) -> Result<Opening, PipelineError> {
    while let Some(event) = upstream.next().await {
        match event? {
            StreamEvent::TextDelta { text } => return Ok(Opening::Text(text)),
            StreamEvent::Done => return Ok(Opening::Finished),
            other => trace!(?other, "upstream event before first chunk"),
        }
    }
    Ok(Opening::Finished)
}

/// A generation stream that has produced its first event.
pub struct PreparedCompletion {
    requested_model_id: String,
    model: ModelSpec,
    prompt_tokens: usize,
    max_completion_tokens: u32,
    retrieval_results: usize,
    replaced_history: bool,
    dropped_messages: usize,
    opening: Opening,
    upstream: EventStream,
    session: StreamSession,
    span: tracing::Span,
}

impl PreparedCompletion {
    /// Model id the client asked for.
    pub fn requested_model_id(&self) -> &str {
        &self.requested_model_id
    }

    /// Model used for budgeting and generation.
    pub fn model_id(&self) -> &str {
        &self.model.id
    }

    pub fn prompt_tokens(&self) -> usize {
        self.prompt_tokens
    }

    pub fn max_completion_tokens(&self) -> u32 {
        self.max_completion_tokens
    }

    pub fn retrieval_results(&self) -> usize {
        self.retrieval_results
    }

    pub fn replaced_history(&self) -> bool {
        self.replaced_history
    }

    pub fn dropped_messages(&self) -> usize {
        self.dropped_messages
    }

    /// Turn the completion into response body chunks.
    ///
    /// Pull-based: the next upstream event is awaited only when the consumer
    /// polls. Dropping the stream drops the upstream and settles the session.
    pub fn into_body_stream(self) -> BodyStream {
        let PreparedCompletion {
            opening,
            mut upstream,
            mut session,
            span,
            ..
        } = self;

        let body = async_stream::stream! {
            match opening {
                Opening::Text(text) => {
                    session.push(&text);
                    yield Ok(text);
                }
                Opening::Finished => {
                    session.finish().await;
                    return;
                }
            }

            while let Some(event) = upstream.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text }) => {
                        session.push(&text);
                        yield Ok(text);
                    }
                    Ok(StreamEvent::Done) => break,
                    Ok(other) => trace!(?other, "upstream event"),
                    Err(e) => {
                        error!(error = %e, "generation stream failed mid-response");
                        session.fail().await;
                        yield Err(stream_error(e));
                        return;
                    }
                }
            }
            session.finish().await;
        };

        Box::pin(StreamInSpan::new(body, span))
    }
}

fn stream_error(err: LlmError) -> PipelineError {
    PipelineError::GenerationStream(err.to_string())
}
