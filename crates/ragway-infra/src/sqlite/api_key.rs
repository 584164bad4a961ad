//! SQLite API key repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use ragway_core::repository::api_key::ApiKeyRepository;
use ragway_types::auth::ApiKeyRecord;
use ragway_types::error::RepositoryError;

use super::pool::DatabasePool;

pub struct SqliteApiKeyRepository {
    pool: DatabasePool,
}

impl SqliteApiKeyRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl ApiKeyRepository for SqliteApiKeyRepository {
    async fn create(&self, record: &ApiKeyRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO api_keys (id, user_id, key_prefix, key_hash, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.user_id)
        .bind(&record.key_prefix)
        .bind(&record.key_hash)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict("api key already exists".to_string())
            }
            other => RepositoryError::Query(other.to_string()),
        })?;
        Ok(())
    }

    async fn find_user_by_hash(&self, key_hash: &str) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT user_id FROM api_keys WHERE key_hash = ?")
            .bind(key_hash)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(row.map(|(user_id,)| user_id))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, key_prefix, key_hash, created_at FROM api_keys WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                ApiKeySqlRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_record()
            })
            .collect()
    }
}

struct ApiKeySqlRow {
    id: String,
    user_id: String,
    key_prefix: String,
    key_hash: String,
    created_at: String,
}

impl ApiKeySqlRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            key_prefix: row.try_get("key_prefix")?,
            key_hash: row.try_get("key_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_record(self) -> Result<ApiKeyRecord, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid uuid: {e}")))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))?;
        Ok(ApiKeyRecord {
            id,
            user_id: self.user_id,
            key_prefix: self.key_prefix,
            key_hash: self.key_hash,
            created_at,
        })
    }
}
