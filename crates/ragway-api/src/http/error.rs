//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use ragway_types::error::{PipelineError, RepositoryError};

use crate::http::response::{ApiResponse, request_id};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chat pipeline failure before the first chunk.
    Pipeline(PipelineError),
    /// Malformed request body.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Pipeline(PipelineError::Storage(e))
    }
}

impl AppError {
    /// Status code and machine-readable error code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Pipeline(e) => match e {
                PipelineError::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                PipelineError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                PipelineError::QuotaExceeded { .. } => {
                    (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXCEEDED")
                }
                PipelineError::Configuration(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
                }
                PipelineError::PromptTooLarge { .. } => {
                    (StatusCode::BAD_REQUEST, "PROMPT_TOO_LARGE")
                }
                PipelineError::Retrieval(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "RETRIEVAL_ERROR")
                }
                PipelineError::Generation(_) | PipelineError::GenerationStream(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_ERROR")
                }
                PipelineError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Pipeline(e) => e.to_string(),
            AppError::Validation(msg) | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        } else {
            tracing::warn!(code, %message, "request rejected");
        }

        ApiResponse::error(code, message, request_id()).into_response_with(status)
    }
}

#[cfg(test)]
mod tests {
    use ragway_types::retrieval::RetrievalFailure;

    use super::*;

    #[test]
    fn test_pipeline_error_status_table() {
        let cases = [
            (
                AppError::from(PipelineError::Auth("no key".to_string())),
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
            ),
            (
                AppError::from(PipelineError::InvalidRequest("no messages".to_string())),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                AppError::from(PipelineError::QuotaExceeded {
                    user_id: "u".to_string(),
                    used: 10,
                    limit: 10,
                }),
                StatusCode::TOO_MANY_REQUESTS,
                "QUOTA_EXCEEDED",
            ),
            (
                AppError::from(PipelineError::Configuration("unknown model".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
            ),
            (
                AppError::from(PipelineError::PromptTooLarge {
                    model_id: "gpt-4".to_string(),
                    context_limit: 8_192,
                    reserved: 1_000,
                }),
                StatusCode::BAD_REQUEST,
                "PROMPT_TOO_LARGE",
            ),
            (
                AppError::from(PipelineError::Retrieval(RetrievalFailure::Search(
                    "offline".to_string(),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
                "RETRIEVAL_ERROR",
            ),
            (
                AppError::from(RepositoryError::Connection),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[tokio::test]
    async fn test_into_response_writes_envelope() {
        use http_body_util::BodyExt;

        let response = AppError::Validation("bad body".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value["data"].is_null());
        assert_eq!(value["errors"][0]["code"], "VALIDATION_ERROR");
        assert_eq!(value["errors"][0]["message"], "bad body");
    }
}
