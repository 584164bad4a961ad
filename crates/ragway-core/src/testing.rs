//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future;
use secrecy::SecretString;

use ragway_types::error::{PipelineError, QuotaError, RepositoryError};
use ragway_types::llm::{CompletionRequest, LlmError, StreamEvent};
use ragway_types::retrieval::{Payload, RetrievalFailure, ScoredPoint, SearchQuery};
use ragway_types::usage::{UsagePeriod, UsageRecord, UsageSummary};

use crate::llm::provider::{EventStream, LlmProvider};
use crate::retrieval::embedder::Embedder;
use crate::retrieval::index::SimilarityIndex;
use crate::tokenizer::{EncoderFactory, TokenEncoder};
use crate::usage::ledger::UsageLedger;

/// One token per whitespace-separated word.
pub struct WordEncoder;

impl TokenEncoder for WordEncoder {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.split_whitespace().map(|w| w.len() as u32).collect()
    }
}

#[derive(Default)]
pub struct WordEncoderFactory {
    loads: AtomicUsize,
}

impl WordEncoderFactory {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl EncoderFactory for WordEncoderFactory {
    fn load(&self, model_id: &str) -> Result<Arc<dyn TokenEncoder>, PipelineError> {
        if model_id.starts_with("gpt-") {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(WordEncoder))
        } else {
            Err(PipelineError::Configuration(format!(
                "no tokenizer for model '{model_id}'"
            )))
        }
    }
}

pub struct FakeEmbedder {
    produced: usize,
    reported: usize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            produced: dimension,
            reported: dimension,
        }
    }

    pub fn reporting_dimension(mut self, dimension: usize) -> Self {
        self.reported = dimension;
        self
    }
}

impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalFailure> {
        Ok(vec![text.len() as f32; self.produced])
    }

    fn model_name(&self) -> &str {
        "fake-embedding"
    }

    fn dimension(&self) -> usize {
        self.reported
    }
}

pub fn point(score: f32, doc: &str) -> ScoredPoint {
    let mut payload = Payload::new();
    payload.insert("doc".to_string(), serde_json::json!(doc));
    ScoredPoint { score, payload }
}

type QueryLog = Arc<Mutex<Vec<(String, SearchQuery)>>>;

pub struct FakeIndex {
    results: Vec<ScoredPoint>,
    failure: Mutex<Option<RetrievalFailure>>,
    queries: QueryLog,
}

impl FakeIndex {
    pub fn with_results(results: Vec<ScoredPoint>) -> Self {
        Self {
            results,
            failure: Mutex::new(None),
            queries: Arc::default(),
        }
    }

    pub fn failing(failure: RetrievalFailure) -> Self {
        Self {
            results: Vec::new(),
            failure: Mutex::new(Some(failure)),
            queries: Arc::default(),
        }
    }

    pub fn queries(&self) -> QueryLog {
        Arc::clone(&self.queries)
    }
}

impl SimilarityIndex for FakeIndex {
    async fn search(
        &self,
        collection: &str,
        query: &SearchQuery,
    ) -> Result<Vec<ScoredPoint>, RetrievalFailure> {
        self.queries
            .lock()
            .unwrap()
            .push((collection.to_string(), query.clone()));
        if let Some(failure) = self.failure.lock().unwrap().take() {
            return Err(failure);
        }
        Ok(self.results.clone())
    }
}

/// Scripted upstream behavior.
#[derive(Clone)]
pub enum Step {
    Event(StreamEvent),
    Fail(String),
    /// Never yields again.
    Hang,
}

pub fn text(chunk: &str) -> Step {
    Step::Event(StreamEvent::TextDelta {
        text: chunk.to_string(),
    })
}

#[derive(Clone)]
pub struct FakeProvider {
    script: Vec<Step>,
    opened: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    credentials: Arc<Mutex<Vec<Option<String>>>>,
}

impl FakeProvider {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            opened: Arc::default(),
            requests: Arc::default(),
            credentials: Arc::default(),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn credentials(&self) -> Vec<Option<String>> {
        self.credentials.lock().unwrap().clone()
    }
}

impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn stream(&self, request: CompletionRequest, credential: Option<SecretString>) -> EventStream {
        use secrecy::ExposeSecret;

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.credentials
            .lock()
            .unwrap()
            .push(credential.map(|c| c.expose_secret().to_string()));
        let script = self.script.clone();
        Box::pin(async_stream::stream! {
            for step in script {
                match step {
                    Step::Event(event) => yield Ok(event),
                    Step::Fail(message) => yield Err(LlmError::Stream(message)),
                    Step::Hang => future::pending::<()>().await,
                }
            }
        })
    }
}

#[derive(Clone)]
pub struct FakeLedger {
    used: u64,
    limit: Option<u64>,
    checks: Arc<AtomicUsize>,
    records: Arc<Mutex<Vec<UsageRecord>>>,
}

impl FakeLedger {
    pub fn unlimited() -> Self {
        Self::with_usage(0, None)
    }

    pub fn with_usage(used: u64, limit: Option<u64>) -> Self {
        Self {
            used,
            limit,
            checks: Arc::default(),
            records: Arc::default(),
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Wait for a record written by a spawned task.
    pub async fn wait_for_records(&self, n: usize) -> Vec<UsageRecord> {
        for _ in 0..100 {
            if self.records.lock().unwrap().len() >= n {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        self.records()
    }
}

impl UsageLedger for FakeLedger {
    async fn check_quota(&self, _user_id: &str, _model_id: &str) -> Result<(), QuotaError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        match self.limit {
            Some(limit) if self.used >= limit => Err(QuotaError::Exceeded {
                used: self.used,
                limit,
            }),
            _ => Ok(()),
        }
    }

    async fn record(&self, record: &UsageRecord) -> Result<(), RepositoryError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn summary(&self, user_id: &str) -> Result<UsageSummary, RepositoryError> {
        let recorded: u64 = self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(UsageRecord::total_tokens)
            .sum();
        Ok(UsageSummary {
            user_id: user_id.to_string(),
            period: UsagePeriod::Monthly,
            period_start: UsagePeriod::Monthly.start_of(chrono::Utc::now()),
            total_tokens: self.used + recorded,
            token_limit: self.limit,
        })
    }
}
