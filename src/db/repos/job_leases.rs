use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::db::error::DbResult;

/// Advisory, time-limited lease on a named job.
#[async_trait]
pub trait JobLeaseRepo: Send + Sync {
    /// Try once to take the lease for `job_name`.
    ///
    /// Succeeds when no lease exists or the existing one expired before `now`.
    /// Never waits for a live lease to be released.
    async fn try_acquire(
        &self,
        job_name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DbResult<bool>;

    /// Release the lease if `holder` still owns it.
    async fn release(&self, job_name: &str, holder: &str) -> DbResult<()>;
}
