//! Streaming chat endpoint.
//!
//! POST /api/v1/chat
//!
//! Runs the chat pipeline up to the first generated chunk, then streams the
//! completion as a chunked `text/event-stream` body whose concatenation is
//! the assistant's answer. Failures before the first chunk return the JSON
//! error envelope; failures after it terminate the body.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;

use ragway_types::chat::ChatRequest;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::state::AppState;

/// POST /api/v1/chat -- retrieval-augmented streaming chat.
pub async fn chat(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let prepared = state.pipeline.prepare(&user.user_id, request).await?;
    tracing::info!(
        user_id = %user.user_id,
        model = prepared.model_id(),
        requested_model = prepared.requested_model_id(),
        prompt_tokens = prepared.prompt_tokens(),
        max_completion_tokens = prepared.max_completion_tokens(),
        retrieval_results = prepared.retrieval_results(),
        replaced_history = prepared.replaced_history(),
        dropped_messages = prepared.dropped_messages(),
        "chat stream opened"
    );

    let mut response = Response::new(Body::from_stream(prepared.into_body_stream()));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-transform"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}
