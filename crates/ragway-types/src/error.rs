use thiserror::Error;

use crate::llm::LlmError;
use crate::retrieval::RetrievalFailure;

/// Errors from repository operations (used by trait definitions in ragway-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the pre-flight quota gate.
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("token quota exceeded: used {used} of {limit}")]
    Exceeded { used: u64, limit: u64 },

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Every way a chat pipeline request can fail.
///
/// Variants before `GenerationStream` can still be turned into a JSON error
/// response; `GenerationStream` happens after headers are sent and only
/// terminates the body.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("quota exceeded for user '{user_id}': used {used} of {limit} tokens")]
    QuotaExceeded {
        user_id: String,
        used: u64,
        limit: u64,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(
        "no message fits the context window of '{model_id}' \
         ({context_limit} tokens, {reserved} reserved for the completion)"
    )]
    PromptTooLarge {
        model_id: String,
        context_limit: u32,
        reserved: u32,
    },

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalFailure),

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("generation stream aborted: {0}")]
    GenerationStream(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl PipelineError {
    pub fn from_quota(user_id: &str, err: QuotaError) -> Self {
        match err {
            QuotaError::Exceeded { used, limit } => PipelineError::QuotaExceeded {
                user_id: user_id.to_string(),
                used,
                limit,
            },
            QuotaError::Storage(e) => PipelineError::Storage(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_quota_error_maps_to_pipeline_error() {
        let err = PipelineError::from_quota("alice", QuotaError::Exceeded { used: 12, limit: 10 });
        match err {
            PipelineError::QuotaExceeded {
                user_id,
                used,
                limit,
            } => {
                assert_eq!(user_id, "alice");
                assert_eq!(used, 12);
                assert_eq!(limit, 10);
            }
            other => panic!("expected QuotaExceeded, got {other}"),
        }
    }

    #[test]
    fn test_quota_storage_error_stays_storage() {
        let err = PipelineError::from_quota("alice", QuotaError::Storage(RepositoryError::Connection));
        assert!(matches!(err, PipelineError::Storage(RepositoryError::Connection)));
    }

    #[test]
    fn test_retrieval_failure_converts() {
        let err: PipelineError = RetrievalFailure::Search("index offline".to_string()).into();
        assert!(err.to_string().contains("index offline"));
    }
}
