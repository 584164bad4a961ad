//! Request-scoped stream session.
//!
//! Owns the encoder lease and the text generated so far. Exactly one of
//! [`StreamSession::finish`], [`StreamSession::fail`] or `Drop` settles the
//! session: it records usage (subject to the partial-usage policy) and
//! releases the lease.

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use ragway_types::usage::{Feature, PartialUsagePolicy, UsageRecord};

use crate::tokenizer::EncoderLease;
use crate::usage::box_ledger::BoxUsageLedger;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    UpstreamFailed,
    ClientAborted,
}

struct SessionState {
    lease: EncoderLease,
    ledger: BoxUsageLedger,
    policy: PartialUsagePolicy,
    user_id: String,
    prompt_tokens: u32,
    text: String,
    chunks: usize,
}

impl SessionState {
    /// Usage record for the outcome, or `None` when the policy skips it.
    fn usage(&self, outcome: SessionOutcome) -> Option<UsageRecord> {
        let completed = outcome == SessionOutcome::Completed;
        if !completed && self.policy == PartialUsagePolicy::Skip {
            return None;
        }
        let completion_tokens = u32::try_from(self.lease.count(&self.text)).unwrap_or(u32::MAX);
        Some(UsageRecord::new(
            self.user_id.clone(),
            self.lease.model_id(),
            Feature::Chat,
            self.prompt_tokens,
            completion_tokens,
            completed,
        ))
    }
}

pub struct StreamSession {
    state: Option<SessionState>,
}

impl StreamSession {
    pub fn new(
        lease: EncoderLease,
        ledger: BoxUsageLedger,
        policy: PartialUsagePolicy,
        user_id: impl Into<String>,
        prompt_tokens: u32,
    ) -> Self {
        Self {
            state: Some(SessionState {
                lease,
                ledger,
                policy,
                user_id: user_id.into(),
                prompt_tokens,
                text: String::new(),
                chunks: 0,
            }),
        }
    }

    /// Append a forwarded chunk to the accumulated text.
    pub fn push(&mut self, chunk: &str) {
        if let Some(state) = self.state.as_mut() {
            state.text.push_str(chunk);
            state.chunks += 1;
        }
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        self.state.as_ref().map(|s| s.text.as_str()).unwrap_or("")
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_none()
    }

    /// Upstream finished normally: record full usage, then release the lease.
    pub async fn finish(&mut self) {
        self.settle(SessionOutcome::Completed).await;
    }

    /// Upstream failed mid-stream: apply the partial-usage policy, then
    /// release the lease.
    pub async fn fail(&mut self) {
        self.settle(SessionOutcome::UpstreamFailed).await;
    }

    async fn settle(&mut self, outcome: SessionOutcome) {
        let Some(state) = self.state.take() else {
            return;
        };
        if let Some(record) = state.usage(outcome) {
            persist(&state.ledger, &record).await;
        }
        debug!(?outcome, chunks = state.chunks, "stream session settled");
        // Lease released here, after the record is written.
        drop(state);
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        let record = state.usage(SessionOutcome::ClientAborted);
        let ledger = state.ledger.clone();
        warn!(
            user_id = %state.user_id,
            chunks = state.chunks,
            recorded = record.is_some(),
            "client disconnected before the stream finished"
        );
        drop(state);

        let Some(record) = record else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    persist(&ledger, &record).await;
                });
            }
            Err(_) => {
                error!(
                    user_id = record.user_id(),
                    "no async runtime available, partial usage not recorded"
                );
            }
        }
    }
}

async fn persist(ledger: &BoxUsageLedger, record: &UsageRecord) {
    match ledger.record(record).await {
        Ok(()) => info!(
            user_id = record.user_id(),
            gen_ai.request.model = record.model_id(),
            gen_ai.usage.input_tokens = record.prompt_tokens(),
            gen_ai.usage.output_tokens = record.completion_tokens(),
            completed = record.completed(),
            "usage recorded"
        ),
        Err(e) => error!(
            user_id = record.user_id(),
            error = %e,
            "failed to record usage"
        ),
    }
}
