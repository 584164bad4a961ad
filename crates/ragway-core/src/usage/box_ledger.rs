//! BoxUsageLedger -- object-safe dynamic dispatch wrapper for UsageLedger.
//!
//! The inner ledger sits behind an `Arc` so a clone can be moved into the
//! task that records usage after a client disconnect.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ragway_types::error::{QuotaError, RepositoryError};
use ragway_types::usage::{UsageRecord, UsageSummary};

use super::ledger::UsageLedger;

pub trait UsageLedgerDyn: Send + Sync {
    fn check_quota_boxed<'a>(
        &'a self,
        user_id: &'a str,
        model_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), QuotaError>> + Send + 'a>>;

    fn record_boxed<'a>(
        &'a self,
        record: &'a UsageRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>>;

    fn summary_boxed<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UsageSummary, RepositoryError>> + Send + 'a>>;
}

impl<T: UsageLedger> UsageLedgerDyn for T {
    fn check_quota_boxed<'a>(
        &'a self,
        user_id: &'a str,
        model_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), QuotaError>> + Send + 'a>> {
        Box::pin(self.check_quota(user_id, model_id))
    }

    fn record_boxed<'a>(
        &'a self,
        record: &'a UsageRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>> {
        Box::pin(self.record(record))
    }

    fn summary_boxed<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UsageSummary, RepositoryError>> + Send + 'a>> {
        Box::pin(self.summary(user_id))
    }
}

/// Type-erased usage ledger, cheap to clone.
#[derive(Clone)]
pub struct BoxUsageLedger {
    inner: Arc<dyn UsageLedgerDyn + Send + Sync>,
}

impl BoxUsageLedger {
    pub fn new<T: UsageLedger + 'static>(ledger: T) -> Self {
        Self {
            inner: Arc::new(ledger),
        }
    }

    pub async fn check_quota(&self, user_id: &str, model_id: &str) -> Result<(), QuotaError> {
        self.inner.check_quota_boxed(user_id, model_id).await
    }

    pub async fn record(&self, record: &UsageRecord) -> Result<(), RepositoryError> {
        self.inner.record_boxed(record).await
    }

    pub async fn summary(&self, user_id: &str) -> Result<UsageSummary, RepositoryError> {
        self.inner.summary_boxed(user_id).await
    }
}
