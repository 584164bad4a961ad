//! UsageLedger trait definition.

use ragway_types::error::{QuotaError, RepositoryError};
use ragway_types::usage::{UsageRecord, UsageSummary};

/// Quota gate and usage store.
///
/// Implementations live in ragway-infra (e.g., `SqliteUsageLedger`).
pub trait UsageLedger: Send + Sync {
    /// Fail with `QuotaError::Exceeded` when the user has used at least their
    /// limit for the current period.
    fn check_quota(
        &self,
        user_id: &str,
        model_id: &str,
    ) -> impl std::future::Future<Output = Result<(), QuotaError>> + Send;

    /// Persist one record and add its total to the period counter atomically.
    fn record(
        &self,
        record: &UsageRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Usage of `user_id` in the current period.
    fn summary(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<UsageSummary, RepositoryError>> + Send;
}
