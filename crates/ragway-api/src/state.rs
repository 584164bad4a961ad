//! Application state wiring all services together.
//!
//! AppState holds the pipeline and repositories used by both the CLI and
//! the REST API, pinned to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use ragway_core::budget::PromptBudgeter;
use ragway_core::llm::box_provider::BoxLlmProvider;
use ragway_core::pipeline::{ChatPipeline, PipelineSettings};
use ragway_core::retrieval::RetrievalAugmenter;
use ragway_core::retrieval::box_embedder::BoxEmbedder;
use ragway_core::retrieval::box_index::BoxSimilarityIndex;
use ragway_core::tokenizer::{EncoderFactory, TokenCounter};
use ragway_core::usage::box_ledger::BoxUsageLedger;
use ragway_infra::config::{load_config, resolve_data_dir};
use ragway_infra::embedding::OpenAiEmbedder;
use ragway_infra::llm::create_provider;
use ragway_infra::sqlite::api_key::SqliteApiKeyRepository;
use ragway_infra::sqlite::pool::{DatabasePool, database_url};
use ragway_infra::sqlite::usage::SqliteUsageLedger;
use ragway_infra::tokenizer::TiktokenEncoderFactory;
use ragway_infra::vector::lance::default_vector_path;
use ragway_infra::vector::{LanceSimilarityIndex, LanceVectorStore};
use ragway_types::config::AppConfig;
use ragway_types::model::ModelRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ChatPipeline,
    pub api_keys: Arc<SqliteApiKeyRepository>,
    pub data_dir: PathBuf,
}

/// External collaborators of the pipeline, built from configuration in
/// production and replaced with fakes in tests.
pub struct Collaborators {
    pub encoders: Arc<dyn EncoderFactory>,
    pub embedder: BoxEmbedder,
    pub index: BoxSimilarityIndex,
    pub provider: BoxLlmProvider,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database and vector store, wire the pipeline.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        let vector_path = config
            .vector
            .path
            .clone()
            .unwrap_or_else(|| default_vector_path(&data_dir));
        let store = LanceVectorStore::new(vector_path).await?;

        let collaborators = Collaborators {
            encoders: Arc::new(TiktokenEncoderFactory),
            embedder: BoxEmbedder::new(OpenAiEmbedder::new(&config.embedding)?),
            index: BoxSimilarityIndex::new(LanceSimilarityIndex::new(store)),
            provider: create_provider(&config.generation),
        };

        tracing::info!(data_dir = %data_dir.display(), "application state initialized");
        Ok(Self::from_parts(&config, db_pool, data_dir, collaborators))
    }

    /// Wire the state from an open database and ready collaborators.
    pub fn from_parts(
        config: &AppConfig,
        db_pool: DatabasePool,
        data_dir: PathBuf,
        collaborators: Collaborators,
    ) -> Self {
        let ledger = BoxUsageLedger::new(SqliteUsageLedger::new(
            db_pool.clone(),
            config.usage.clone(),
        ));
        let augmenter = RetrievalAugmenter::new(
            collaborators.embedder,
            collaborators.index,
            config.pipeline.collection.clone(),
            config.pipeline.top_k,
        );
        let settings = PipelineSettings {
            default_system_prompt: config.pipeline.default_system_prompt.clone(),
            default_temperature: config.pipeline.default_temperature,
            generation_model: config.generation.model.clone(),
            partial_policy: config.usage.partial_policy,
        };
        let pipeline = ChatPipeline::new(
            Arc::new(ModelRegistry::with_overrides(&config.models)),
            Arc::new(TokenCounter::new(collaborators.encoders)),
            PromptBudgeter::new(config.pipeline.reserved_completion_tokens),
            augmenter,
            collaborators.provider,
            ledger,
            settings,
        );

        Self {
            pipeline,
            api_keys: Arc::new(SqliteApiKeyRepository::new(db_pool)),
            data_dir,
        }
    }
}
