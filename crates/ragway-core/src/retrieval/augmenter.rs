use ragway_types::error::PipelineError;
use ragway_types::llm::Message;
use ragway_types::retrieval::{ScoredPoint, SearchQuery};

use super::box_embedder::BoxEmbedder;
use super::box_index::BoxSimilarityIndex;
use crate::budget::message_cost;
use crate::tokenizer::EncoderLease;

/// Default number of neighbors requested from the index.
pub const DEFAULT_TOP_K: usize = 8;

/// A prompt grounded in retrieval results.
#[derive(Debug, Clone, PartialEq)]
pub struct Augmentation {
    pub messages: Vec<Message>,
    /// Results embedded in the synthetic message, best first.
    pub results: Vec<ScoredPoint>,
    /// `true` when the index returned at most one result and the synthetic
    /// message replaced the whole history.
    pub replaced_history: bool,
    /// Oldest history messages removed so the grounding message fits.
    pub trimmed_history: usize,
}

/// Embeds the newest message, searches the index, and injects the results
/// as a synthetic system turn.
///
/// More than one result: the synthetic message replaces the last message and
/// earlier history is kept. Zero or one result: the synthetic message is the
/// only message. The threshold is applied to the raw result count.
#[derive(Clone)]
pub struct RetrievalAugmenter {
    embedder: BoxEmbedder,
    index: BoxSimilarityIndex,
    collection: String,
    top_k: usize,
}

impl RetrievalAugmenter {
    pub fn new(
        embedder: BoxEmbedder,
        index: BoxSimilarityIndex,
        collection: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            top_k,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn augment(&self, messages: &[Message]) -> Result<Augmentation, PipelineError> {
        let Some(last) = messages.last() else {
            return Ok(Augmentation {
                messages: Vec::new(),
                results: Vec::new(),
                replaced_history: false,
                trimmed_history: 0,
            });
        };
        let results = self.retrieve(&last.content).await?;
        Ok(assemble(messages, &last.content, results))
    }

    /// Like [`augment`](Self::augment), fitting the result into `allowance`
    /// tokens.
    ///
    /// Lowest-ranked results are dropped first. If the grounding message
    /// still does not fit and history is kept, the oldest history messages
    /// are dropped next; the grounding message always stays last. If even the
    /// grounding message alone does not fit, the result-free augmentation is
    /// returned and the caller decides.
    pub async fn augment_within(
        &self,
        messages: &[Message],
        lease: &EncoderLease,
        allowance: usize,
    ) -> Result<Augmentation, PipelineError> {
        let Some(last) = messages.last() else {
            return self.augment(messages).await;
        };
        let mut results = self.retrieve(&last.content).await?;
        let keep_history = results.len() > 1;
        let cost_of = |augmentation: &Augmentation| -> usize {
            augmentation
                .messages
                .iter()
                .map(|m| message_cost(lease, m))
                .sum()
        };

        let mut augmentation = assemble_with_policy(messages, &last.content, &results, keep_history);
        let mut cost = cost_of(&augmentation);
        while cost > allowance && !results.is_empty() {
            let dropped = results.pop();
            tracing::debug!(
                score = dropped.as_ref().map(|p| p.score),
                remaining = results.len(),
                cost,
                allowance,
                "dropping lowest-ranked retrieval result to fit budget"
            );
            augmentation = assemble_with_policy(messages, &last.content, &results, keep_history);
            cost = cost_of(&augmentation);
        }

        if cost > allowance && keep_history {
            let history_len = augmentation.messages.len() - 1;
            let mut trimmed = 0;
            while cost > allowance && trimmed < history_len {
                cost -= message_cost(lease, &augmentation.messages[trimmed]);
                trimmed += 1;
            }
            if trimmed > 0 {
                tracing::debug!(
                    trimmed,
                    cost,
                    allowance,
                    "dropping oldest history messages to fit grounding message"
                );
                augmentation.messages.drain(..trimmed);
                augmentation.trimmed_history = trimmed;
            }
        }
        Ok(augmentation)
    }

    #[tracing::instrument(
        name = "retrieval",
        skip_all,
        fields(collection = %self.collection, top_k = self.top_k, results)
    )]
    async fn retrieve(&self, text: &str) -> Result<Vec<ScoredPoint>, PipelineError> {
        let vector = self.embedder.embed(text).await?;
        let query = SearchQuery {
            vector,
            limit: self.top_k,
        };
        let mut results = self.index.search(&self.collection, &query).await?;
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(self.top_k);
        tracing::Span::current().record("results", results.len());
        Ok(results)
    }
}

fn assemble(messages: &[Message], question: &str, results: Vec<ScoredPoint>) -> Augmentation {
    let keep_history = results.len() > 1;
    assemble_with_policy(messages, question, &results, keep_history)
}

fn assemble_with_policy(
    messages: &[Message],
    question: &str,
    results: &[ScoredPoint],
    keep_history: bool,
) -> Augmentation {
    let synthetic = Message::system(grounding_content(question, results));
    let augmented = if keep_history {
        let mut kept = messages[..messages.len() - 1].to_vec();
        kept.push(synthetic);
        kept
    } else {
        vec![synthetic]
    };
    Augmentation {
        messages: augmented,
        results: results.to_vec(),
        replaced_history: !keep_history,
        trimmed_history: 0,
    }
}

/// Content of the synthetic grounding message.
///
/// Deterministic for a given question and result list: payload maps are
/// ordered by key when serialized.
pub fn grounding_content(question: &str, results: &[ScoredPoint]) -> String {
    let serialized = serde_json::to_string(results).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Answer the question using the retrieved context when it is relevant.\n\n\
         Question: {question}\n\n\
         Retrieved context (score and payload, best first):\n{serialized}"
    )
}
