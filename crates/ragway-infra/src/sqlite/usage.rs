//! SQLite usage ledger.
//!
//! `usage_records` is an append-only log; `usage_totals` holds one running
//! counter per user and accounting period. A record and its counter update
//! commit in the same transaction on the single-connection writer pool.

use chrono::{DateTime, Utc};

use ragway_core::usage::ledger::UsageLedger;
use ragway_types::config::UsageConfig;
use ragway_types::error::{QuotaError, RepositoryError};
use ragway_types::usage::{UsageRecord, UsageSummary};

use super::pool::DatabasePool;

pub struct SqliteUsageLedger {
    pool: DatabasePool,
    config: UsageConfig,
}

impl SqliteUsageLedger {
    pub fn new(pool: DatabasePool, config: UsageConfig) -> Self {
        Self { pool, config }
    }

    async fn used_in_period(
        &self,
        user_id: &str,
        period_start: &DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT total_tokens FROM usage_totals WHERE user_id = ? AND period_start = ?",
        )
        .bind(user_id)
        .bind(format_datetime(period_start))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(row.map(|(total,)| total.max(0) as u64).unwrap_or(0))
    }
}

impl UsageLedger for SqliteUsageLedger {
    async fn check_quota(&self, user_id: &str, model_id: &str) -> Result<(), QuotaError> {
        let Some(limit) = self.config.limit_for(user_id) else {
            return Ok(());
        };
        let period_start = self.config.period.start_of(Utc::now());
        let used = self.used_in_period(user_id, &period_start).await?;
        if used >= limit {
            tracing::info!(user_id, model_id, used, limit, "token quota exhausted");
            return Err(QuotaError::Exceeded { used, limit });
        }
        Ok(())
    }

    async fn record(&self, record: &UsageRecord) -> Result<(), RepositoryError> {
        let period_start = format_datetime(&self.config.period.start_of(record.created_at()));
        let created_at = format_datetime(&record.created_at());
        let total_tokens = i64::try_from(record.total_tokens())
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO usage_records (user_id, model_id, feature, prompt_tokens, completion_tokens, total_tokens, completed, period_start, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.user_id())
        .bind(record.model_id())
        .bind(record.feature().to_string())
        .bind(i64::from(record.prompt_tokens()))
        .bind(i64::from(record.completion_tokens()))
        .bind(total_tokens)
        .bind(record.completed())
        .bind(&period_start)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO usage_totals (user_id, period_start, total_tokens, request_count, updated_at)
               VALUES (?, ?, ?, 1, ?)
               ON CONFLICT (user_id, period_start) DO UPDATE SET
                   total_tokens = total_tokens + excluded.total_tokens,
                   request_count = request_count + 1,
                   updated_at = excluded.updated_at"#,
        )
        .bind(record.user_id())
        .bind(&period_start)
        .bind(total_tokens)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn summary(&self, user_id: &str) -> Result<UsageSummary, RepositoryError> {
        let period_start = self.config.period.start_of(Utc::now());
        let total_tokens = self.used_in_period(user_id, &period_start).await?;
        Ok(UsageSummary {
            user_id: user_id.to_string(),
            period: self.config.period,
            period_start,
            total_tokens,
            token_limit: self.config.limit_for(user_id),
        })
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use ragway_types::config::QuotaOverride;
    use ragway_types::usage::{Feature, UsagePeriod};

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn limited(limit: u64) -> UsageConfig {
        UsageConfig {
            period: UsagePeriod::Monthly,
            default_token_limit: Some(limit),
            ..UsageConfig::default()
        }
    }

    #[tokio::test]
    async fn test_record_updates_totals_and_log() {
        let pool = test_pool().await;
        let ledger = SqliteUsageLedger::new(pool.clone(), limited(10_000));

        ledger
            .record(&UsageRecord::new("alice", "gpt-4", Feature::Chat, 100, 20, true))
            .await
            .unwrap();
        ledger
            .record(&UsageRecord::new("alice", "gpt-4", Feature::Chat, 50, 5, false))
            .await
            .unwrap();

        let summary = ledger.summary("alice").await.unwrap();
        assert_eq!(summary.total_tokens, 175);
        assert_eq!(summary.token_limit, Some(10_000));
        assert_eq!(summary.remaining(), Some(9_825));

        let rows: Vec<(i64, i64, i64, bool)> = sqlx::query_as(
            "SELECT prompt_tokens, completion_tokens, total_tokens, completed FROM usage_records ORDER BY id",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();
        assert_eq!(rows, vec![(100, 20, 120, true), (50, 5, 55, false)]);
    }

    #[tokio::test]
    async fn test_quota_blocks_at_limit() {
        let ledger = SqliteUsageLedger::new(test_pool().await, limited(100));

        ledger.check_quota("bob", "gpt-4").await.unwrap();
        ledger
            .record(&UsageRecord::new("bob", "gpt-4", Feature::Chat, 60, 39, true))
            .await
            .unwrap();
        ledger.check_quota("bob", "gpt-4").await.unwrap();
        ledger
            .record(&UsageRecord::new("bob", "gpt-4", Feature::Chat, 1, 0, true))
            .await
            .unwrap();

        let err = ledger.check_quota("bob", "gpt-4").await.unwrap_err();
        assert!(matches!(err, QuotaError::Exceeded { used: 100, limit: 100 }));
        // Other users are unaffected.
        ledger.check_quota("carol", "gpt-4").await.unwrap();
    }

    #[tokio::test]
    async fn test_unlimited_and_override() {
        let config = UsageConfig {
            default_token_limit: Some(10),
            overrides: vec![QuotaOverride {
                user_id: "admin".to_string(),
                token_limit: None,
            }],
            ..UsageConfig::default()
        };
        let ledger = SqliteUsageLedger::new(test_pool().await, config);
        ledger
            .record(&UsageRecord::new("admin", "gpt-4", Feature::Chat, 500, 500, true))
            .await
            .unwrap();

        ledger.check_quota("admin", "gpt-4").await.unwrap();
        let summary = ledger.summary("admin").await.unwrap();
        assert_eq!(summary.token_limit, None);
        assert!(!summary.is_exhausted());
    }

    #[tokio::test]
    async fn test_concurrent_records_lose_no_updates() {
        let ledger = Arc::new(SqliteUsageLedger::new(test_pool().await, limited(1_000_000)));

        let mut handles = Vec::new();
        for i in 0..20u32 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .record(&UsageRecord::new("dave", "gpt-4", Feature::Chat, 10 + i, 5, true))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let expected: u64 = (0..20u64).map(|i| 10 + i + 5).sum();
        assert_eq!(ledger.summary("dave").await.unwrap().total_tokens, expected);
    }
}
