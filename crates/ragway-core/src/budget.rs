//! Token-budgeted message selection.
//!
//! Picks the longest suffix of the conversation that fits in the model's
//! context window after the system prompt and the completion reservation.
//! Messages are never cut; the first message that does not fit and
//! everything older than it are dropped.

use ragway_types::error::PipelineError;
use ragway_types::llm::Message;
use ragway_types::model::ModelSpec;

use crate::tokenizer::EncoderLease;

/// Per-message framing tokens (role marker and separators).
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Cost of one message in the prompt.
pub fn message_cost(lease: &EncoderLease, message: &Message) -> usize {
    lease.count(&message.content) + MESSAGE_OVERHEAD_TOKENS
}

/// Cost of the system prompt; zero when empty.
pub fn system_cost(lease: &EncoderLease, system_prompt: &str) -> usize {
    if system_prompt.is_empty() {
        0
    } else {
        lease.count(system_prompt) + MESSAGE_OVERHEAD_TOKENS
    }
}

/// Output of [`PromptBudgeter::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetedPrompt {
    /// Selected history, oldest first.
    pub messages: Vec<Message>,
    /// System prompt cost included in `tokens_used`.
    pub system_tokens: usize,
    /// System prompt plus selected messages.
    pub tokens_used: usize,
    /// Completion cap for the generation request.
    pub max_completion_tokens: u32,
    /// Number of older messages that did not fit.
    pub dropped: usize,
}

impl BudgetedPrompt {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PromptBudgeter {
    reserved_completion_tokens: u32,
}

impl PromptBudgeter {
    pub fn new(reserved_completion_tokens: u32) -> Self {
        Self {
            reserved_completion_tokens,
        }
    }

    pub fn reserved_completion_tokens(&self) -> u32 {
        self.reserved_completion_tokens
    }

    /// Tokens available to history messages once the system prompt and the
    /// reservation are accounted for.
    pub fn message_allowance(
        &self,
        lease: &EncoderLease,
        model: &ModelSpec,
        system_prompt: &str,
    ) -> Result<usize, PipelineError> {
        let system = system_cost(lease, system_prompt);
        let fixed = system + self.reserved_completion_tokens as usize;
        let limit = model.context_limit as usize;
        if fixed > limit {
            return Err(PipelineError::Configuration(format!(
                "system prompt ({system} tokens) plus completion reservation ({} tokens) \
                 exceeds the context limit of '{}' ({limit} tokens)",
                self.reserved_completion_tokens, model.id
            )));
        }
        Ok(limit - fixed)
    }

    pub fn build(
        &self,
        lease: &EncoderLease,
        model: &ModelSpec,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<BudgetedPrompt, PipelineError> {
        let allowance = self.message_allowance(lease, model, system_prompt)?;
        let system_tokens = system_cost(lease, system_prompt);

        let mut selected = Vec::new();
        let mut used = 0usize;
        for message in history.iter().rev() {
            let cost = message_cost(lease, message);
            if used + cost > allowance {
                break;
            }
            used += cost;
            selected.push(message.clone());
        }
        selected.reverse();

        let tokens_used = system_tokens + used;
        let dropped = history.len() - selected.len();
        if dropped > 0 {
            tracing::debug!(
                model_id = %model.id,
                dropped,
                kept = selected.len(),
                "history truncated to fit context window"
            );
        }

        Ok(BudgetedPrompt {
            messages: selected,
            system_tokens,
            tokens_used,
            max_completion_tokens: max_completion_tokens(model, tokens_used),
            dropped,
        })
    }
}

/// `clamp(context_limit - tokens_used, 0, max_output_tokens)`.
pub fn max_completion_tokens(model: &ModelSpec, tokens_used: usize) -> u32 {
    let remaining = (model.context_limit as usize).saturating_sub(tokens_used);
    remaining.min(model.max_output_tokens as usize) as u32
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::WordEncoderFactory;
    use crate::tokenizer::TokenCounter;

    fn lease() -> (TokenCounter, EncoderLease) {
        let counter = TokenCounter::new(Arc::new(WordEncoderFactory::default()));
        let lease = counter.acquire("gpt-4").unwrap();
        (counter, lease)
    }

    fn words(n: usize) -> String {
        vec!["w"; n].join(" ")
    }

    #[test]
    fn test_everything_fits_with_large_budget() {
        let (_counter, lease) = lease();
        let model = ModelSpec::chat("gpt-4", "GPT-4", 10_000, 1_000);
        let history = vec![Message::user("Hi"), Message::assistant("Hello there")];

        let prompt = PromptBudgeter::new(100)
            .build(&lease, &model, "", &history)
            .unwrap();

        assert_eq!(prompt.messages, history);
        assert_eq!(prompt.system_tokens, 0);
        assert_eq!(prompt.tokens_used, (1 + 4) + (2 + 4));
        assert_eq!(prompt.dropped, 0);
        assert_eq!(prompt.max_completion_tokens, 1_000);
    }

    #[test]
    fn test_boundary_message_excluded_not_truncated() {
        let (_counter, lease) = lease();
        // allowance = 100 - 10 (system 6 + 4) - 20 = 70
        let model = ModelSpec::chat("gpt-4", "GPT-4", 100, 50);
        let history = vec![
            Message::user(words(30)),      // 34
            Message::assistant(words(30)), // 34
            Message::user(words(36)),      // 40
        ];

        let prompt = PromptBudgeter::new(20)
            .build(&lease, &model, &words(6), &history)
            .unwrap();

        assert_eq!(prompt.messages, vec![history[2].clone()]);
        assert_eq!(prompt.dropped, 2);
        assert_eq!(prompt.tokens_used, 10 + 40);
        // Adding the next older message would break the limit.
        assert!(prompt.tokens_used + 34 + 20 > 100);
        // Boundary message was not cut.
        assert_eq!(prompt.messages[0].content, words(36));
        assert_eq!(prompt.max_completion_tokens, 50);
    }

    #[test]
    fn test_completion_cap_clamped_to_remaining_window() {
        let (_counter, lease) = lease();
        let model = ModelSpec::chat("gpt-4", "GPT-4", 100, 500);
        let history = vec![Message::user(words(56))]; // 60

        let prompt = PromptBudgeter::new(30)
            .build(&lease, &model, "", &history)
            .unwrap();

        assert_eq!(prompt.tokens_used, 60);
        assert_eq!(prompt.max_completion_tokens, 40);
    }

    #[test]
    fn test_oversized_system_prompt_is_configuration_error() {
        let (_counter, lease) = lease();
        let model = ModelSpec::chat("gpt-4", "GPT-4", 50, 50);
        let err = PromptBudgeter::new(30)
            .build(&lease, &model, &words(20), &[Message::user("Hi")])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_single_oversized_message_yields_empty_selection() {
        let (_counter, lease) = lease();
        let model = ModelSpec::chat("gpt-4", "GPT-4", 50, 50);
        let prompt = PromptBudgeter::new(10)
            .build(&lease, &model, "", &[Message::user(words(100))])
            .unwrap();
        assert!(prompt.is_empty());
        assert_eq!(prompt.dropped, 1);
        assert_eq!(prompt.tokens_used, 0);
    }

    #[test]
    fn test_budget_invariant_and_order_hold_for_many_histories() {
        let (_counter, lease) = lease();
        let model = ModelSpec::chat("gpt-4", "GPT-4", 200, 64);
        let budgeter = PromptBudgeter::new(40);

        for len in 0..25usize {
            let history: Vec<Message> = (0..len)
                .map(|i| {
                    let body = format!("{i} {}", words((i * 7) % 23));
                    if i % 2 == 0 {
                        Message::user(body)
                    } else {
                        Message::assistant(body)
                    }
                })
                .collect();

            let prompt = budgeter.build(&lease, &model, "be brief", &history).unwrap();

            assert!(prompt.tokens_used + 40 <= 200, "len={len}");
            // Selected messages are a suffix of the history, in order.
            assert_eq!(
                prompt.messages.as_slice(),
                &history[history.len() - prompt.messages.len()..]
            );
            let recomputed: usize = prompt.system_tokens
                + prompt
                    .messages
                    .iter()
                    .map(|m| message_cost(&lease, m))
                    .sum::<usize>();
            assert_eq!(recomputed, prompt.tokens_used);
            if prompt.dropped > 0 {
                let boundary = &history[history.len() - prompt.messages.len() - 1];
                assert!(prompt.tokens_used + message_cost(&lease, boundary) + 40 > 200);
            }
        }
    }
}
