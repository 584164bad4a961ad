//! Usage accounting types: records, quota periods, and summaries.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which product feature consumed the tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Chat,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Chat => write!(f, "chat"),
        }
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Feature::Chat),
            other => Err(format!("invalid feature: '{other}'")),
        }
    }
}

/// Token consumption of one request.
///
/// Fields are private so that `total_tokens == prompt_tokens + completion_tokens`
/// holds for every record ever constructed. The total is widened to `u64`
/// so the sum cannot overflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    user_id: String,
    model_id: String,
    feature: Feature,
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u64,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        user_id: impl Into<String>,
        model_id: impl Into<String>,
        feature: Feature,
        prompt_tokens: u32,
        completion_tokens: u32,
        completed: bool,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            model_id: model_id.into(),
            feature,
            prompt_tokens,
            completion_tokens,
            total_tokens: u64::from(prompt_tokens) + u64::from(completion_tokens),
            completed,
            created_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn prompt_tokens(&self) -> u32 {
        self.prompt_tokens
    }

    pub fn completion_tokens(&self) -> u32 {
        self.completion_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// `false` when the stream ended early (client abort or upstream error).
    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Quota accounting period. Boundaries are computed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsagePeriod {
    Daily,
    Monthly,
}

impl UsagePeriod {
    /// Start of the period containing `at`.
    pub fn start_of(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let (year, month, day) = match self {
            UsagePeriod::Daily => (at.year(), at.month(), at.day()),
            UsagePeriod::Monthly => (at.year(), at.month(), 1),
        };
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .unwrap_or(at)
    }
}

impl fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsagePeriod::Daily => write!(f, "daily"),
            UsagePeriod::Monthly => write!(f, "monthly"),
        }
    }
}

/// What to do with tokens generated by a stream that did not finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialUsagePolicy {
    /// Record the tokens generated so far, flagged as incomplete.
    #[default]
    Record,
    /// Record nothing for incomplete streams.
    Skip,
}

/// Usage of one user within the current accounting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub user_id: String,
    pub period: UsagePeriod,
    pub period_start: DateTime<Utc>,
    pub total_tokens: u64,
    /// `None` means unlimited.
    pub token_limit: Option<u64>,
}

impl UsageSummary {
    pub fn remaining(&self) -> Option<u64> {
        self.token_limit
            .map(|limit| limit.saturating_sub(self.total_tokens))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.token_limit, Some(limit) if self.total_tokens >= limit)
    }
}
