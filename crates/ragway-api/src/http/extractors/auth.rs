//! API key authentication extractor.
//!
//! Extracts and verifies API keys from:
//! - `Authorization: Bearer <key>` header
//! - `X-API-Key: <key>` header
//!
//! Keys are SHA-256 hashed and looked up in the `api_keys` table, which maps
//! them to the user id that quota and usage are accounted against.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rand::RngCore;
use sha2::{Digest, Sha256};

use ragway_core::repository::api_key::ApiKeyRepository;
use ragway_types::error::PipelineError;

use crate::http::error::AppError;
use crate::state::AppState;

/// Prefix of every generated key.
pub const KEY_PREFIX: &str = "rgw_";

/// Characters of the key kept for display.
const DISPLAY_PREFIX_LEN: usize = 8;

/// The user an authenticated request acts for.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = extract_api_key(parts)?;
        let key_hash = hash_api_key(&api_key);

        match state.api_keys.find_user_by_hash(&key_hash).await? {
            Some(user_id) => Ok(AuthenticatedUser { user_id }),
            None => Err(unauthorized(
                "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.",
            )),
        }
    }
}

/// Extract the API key from request headers.
fn extract_api_key(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth
            .to_str()
            .map_err(|_| unauthorized("Invalid Authorization header encoding"))?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return non_empty(key);
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        let key_str = key
            .to_str()
            .map_err(|_| unauthorized("Invalid X-API-Key header encoding"))?;
        return non_empty(key_str);
    }

    Err(unauthorized(
        "Missing API key. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.",
    ))
}

fn non_empty(key: &str) -> Result<String, AppError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(unauthorized("Empty API key"));
    }
    Ok(key.to_string())
}

fn unauthorized(message: &str) -> AppError {
    AppError::Pipeline(PipelineError::Auth(message.to_string()))
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

/// A freshly generated key with its display prefix and hash.
pub struct GeneratedKey {
    pub plaintext: String,
    pub prefix: String,
    pub hash: String,
}

/// Generate a new random API key: `rgw_` followed by 64 hex characters.
pub fn generate_api_key() -> GeneratedKey {
    let mut key_bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut key_bytes);
    let plaintext = format!(
        "{KEY_PREFIX}{}",
        key_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    );
    GeneratedKey {
        prefix: plaintext[..DISPLAY_PREFIX_LEN].to_string(),
        hash: hash_api_key(&plaintext),
        plaintext,
    }
}
