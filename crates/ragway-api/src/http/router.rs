//! Axum router configuration with middleware.
//!
//! API routes are under `/api/v1/`; `/health` is unauthenticated.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/usage", get(handlers::usage::get_usage));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use ragway_core::llm::box_provider::BoxLlmProvider;
    use ragway_core::llm::provider::{EventStream, LlmProvider};
    use ragway_core::repository::api_key::ApiKeyRepository;
    use ragway_core::retrieval::box_embedder::BoxEmbedder;
    use ragway_core::retrieval::box_index::BoxSimilarityIndex;
    use ragway_core::retrieval::embedder::Embedder;
    use ragway_core::retrieval::index::SimilarityIndex;
    use ragway_infra::sqlite::pool::{DatabasePool, database_url};
    use ragway_infra::tokenizer::TiktokenEncoderFactory;
    use ragway_types::auth::ApiKeyRecord;
    use ragway_types::config::AppConfig;
    use ragway_types::llm::{CompletionRequest, LlmError, StreamEvent};
    use ragway_types::retrieval::{RetrievalFailure, ScoredPoint, SearchQuery};

    use super::*;
    use crate::http::extractors::auth::generate_api_key;
    use crate::state::Collaborators;

    const DIM: usize = 3;

    struct FixedEmbedder;

    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalFailure> {
            Ok(vec![0.1; DIM])
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    struct FixedIndex {
        fail: bool,
    }

    impl SimilarityIndex for FixedIndex {
        async fn search(
            &self,
            _collection: &str,
            _query: &SearchQuery,
        ) -> Result<Vec<ScoredPoint>, RetrievalFailure> {
            if self.fail {
                return Err(RetrievalFailure::Search("index offline".to_string()));
            }
            let mut payload = serde_json::Map::new();
            payload.insert("doc".to_string(), serde_json::json!("refund policy: 30 days"));
            Ok(vec![ScoredPoint {
                score: 0.9,
                payload,
            }])
        }
    }

    /// Streams fixed chunks and counts how often it was opened.
    #[derive(Clone)]
    struct ChunkProvider {
        chunks: Vec<&'static str>,
        opened: Arc<Mutex<usize>>,
    }

    impl LlmProvider for ChunkProvider {
        fn name(&self) -> &str {
            "test"
        }

        fn stream(&self, _request: CompletionRequest, _credential: Option<SecretString>) -> EventStream {
            *self.opened.lock().unwrap() += 1;
            let mut events: Vec<Result<StreamEvent, LlmError>> = vec![Ok(StreamEvent::Connected)];
            events.extend(self.chunks.iter().map(|c| {
                Ok(StreamEvent::TextDelta {
                    text: c.to_string(),
                })
            }));
            events.push(Ok(StreamEvent::Done));
            Box::pin(futures_util::stream::iter(events))
        }
    }

    struct Harness {
        router: Router,
        key: String,
        opened: Arc<Mutex<usize>>,
        _tmp: TempDir,
    }

    async fn harness(config: AppConfig, index_fails: bool) -> Harness {
        let tmp = TempDir::new().unwrap();
        let pool = DatabasePool::new(&database_url(tmp.path())).await.unwrap();

        let generated = generate_api_key();
        let state_key = generated.plaintext.clone();
        let opened = Arc::new(Mutex::new(0));
        let provider = ChunkProvider {
            chunks: vec!["Refunds ", "take ", "30 days."],
            opened: opened.clone(),
        };

        let state = AppState::from_parts(
            &config,
            pool,
            tmp.path().to_path_buf(),
            Collaborators {
                encoders: Arc::new(TiktokenEncoderFactory),
                embedder: BoxEmbedder::new(FixedEmbedder),
                index: BoxSimilarityIndex::new(FixedIndex { fail: index_fails }),
                provider: BoxLlmProvider::new(provider),
            },
        );
        state
            .api_keys
            .create(&ApiKeyRecord::new("alice", generated.prefix, generated.hash))
            .await
            .unwrap();

        Harness {
            router: build_router(state),
            key: state_key,
            opened,
            _tmp: tmp,
        }
    }

    fn chat_request(key: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/chat")
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {key}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn hello_body() -> serde_json::Value {
        serde_json::json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "How long do refunds take?"}],
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let h = harness(AppConfig::default(), false).await;
        let response = h
            .router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_streams_completion_and_records_usage() {
        let h = harness(AppConfig::default(), false).await;

        let response = h
            .router
            .clone()
            .oneshot(chat_request(Some(&h.key), hello_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(response.headers()["x-accel-buffering"], "no");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Refunds take 30 days.");
        assert_eq!(*h.opened.lock().unwrap(), 1);

        let usage = h
            .router
            .oneshot(
                Request::get("/api/v1/usage")
                    .header("x-api-key", &h.key)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(usage.status(), StatusCode::OK);
        let value = body_json(usage).await;
        assert_eq!(value["data"]["user_id"], "alice");
        assert!(value["data"]["total_tokens"].as_u64().unwrap() > 0);
        assert!(value["data"]["remaining_tokens"].is_null());
    }

    #[tokio::test]
    async fn test_chat_without_key_is_unauthorized() {
        let h = harness(AppConfig::default(), false).await;
        let response = h.router.oneshot(chat_request(None, hello_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["errors"][0]["code"], "UNAUTHORIZED");
        assert_eq!(*h.opened.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_chat_with_unknown_key_is_unauthorized() {
        let h = harness(AppConfig::default(), false).await;
        let response = h
            .router
            .oneshot(chat_request(Some("rgw_not-a-real-key"), hello_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_over_quota_user_gets_429_without_generation() {
        let mut config = AppConfig::default();
        config.usage.default_token_limit = Some(0);
        let h = harness(config, false).await;

        let response = h
            .router
            .oneshot(chat_request(Some(&h.key), hello_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let value = body_json(response).await;
        assert!(value["data"].is_null());
        assert_eq!(value["errors"][0]["code"], "QUOTA_EXCEEDED");
        assert_eq!(*h.opened.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_500_before_any_bytes() {
        let h = harness(AppConfig::default(), true).await;

        let response = h
            .router
            .oneshot(chat_request(Some(&h.key), hello_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["errors"][0]["code"], "RETRIEVAL_ERROR");
        assert_eq!(*h.opened.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_is_configuration_error() {
        let h = harness(AppConfig::default(), false).await;
        let body = serde_json::json!({
            "model": "no-such-model",
            "messages": [{"role": "user", "content": "Hi"}],
        });

        let response = h.router.oneshot(chat_request(Some(&h.key), body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["errors"][0]["code"],
            "CONFIGURATION_ERROR"
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let h = harness(AppConfig::default(), false).await;
        let response = h
            .router
            .oneshot(chat_request(Some(&h.key), serde_json::json!({"messages": "nope"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_empty_messages_is_validation_error() {
        let h = harness(AppConfig::default(), false).await;
        let body = serde_json::json!({"model": "gpt-4", "messages": []});
        let response = h.router.oneshot(chat_request(Some(&h.key), body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["errors"][0]["code"], "VALIDATION_ERROR");
        assert_eq!(*h.opened.lock().unwrap(), 0);
    }
}
