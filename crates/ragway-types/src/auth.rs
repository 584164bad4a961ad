//! API key records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored API key. The plaintext key is never kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub user_id: String,
    /// First characters of the key, for display (e.g. "rgw_3f9a").
    pub key_prefix: String,
    /// Hex-encoded SHA-256 of the full key.
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
}

impl ApiKeyRecord {
    pub fn new(user_id: impl Into<String>, key_prefix: String, key_hash: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.into(),
            key_prefix,
            key_hash,
            created_at: Utc::now(),
        }
    }
}
