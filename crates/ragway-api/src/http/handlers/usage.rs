//! Usage endpoint.
//!
//! GET /api/v1/usage - Current-period token usage of the calling user.

use std::time::Instant;

use axum::extract::State;
use serde::Serialize;

use ragway_types::usage::UsageSummary;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::http::response::{ApiResponse, request_id};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UsageView {
    #[serde(flatten)]
    pub summary: UsageSummary,
    /// `null` when the user has no limit.
    pub remaining_tokens: Option<u64>,
}

impl From<UsageSummary> for UsageView {
    fn from(summary: UsageSummary) -> Self {
        Self {
            remaining_tokens: summary.remaining(),
            summary,
        }
    }
}

/// GET /api/v1/usage
pub async fn get_usage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<UsageView>, AppError> {
    let start = Instant::now();
    let summary = state.pipeline.ledger().summary(&user.user_id).await?;
    Ok(ApiResponse::success(
        UsageView::from(summary),
        request_id(),
        start,
    ))
}
