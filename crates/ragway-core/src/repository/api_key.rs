//! API key repository trait definition.

use ragway_types::auth::ApiKeyRecord;
use ragway_types::error::RepositoryError;

/// Storage for hashed API keys.
///
/// Only SHA-256 hashes are stored; the plaintext key is shown once on
/// creation and never persisted.
pub trait ApiKeyRepository: Send + Sync {
    fn create(
        &self,
        record: &ApiKeyRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Resolve a key hash to its owning user id.
    fn find_user_by_hash(
        &self,
        key_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, RepositoryError>> + Send;

    fn list_for_user(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ApiKeyRecord>, RepositoryError>> + Send;
}
