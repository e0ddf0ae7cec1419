use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::DbResult;

/// Live records of one category in the processing database.
///
/// Every predicate here is `timestamp_validation_close < watermark`.
#[async_trait]
pub trait ProcessingRepo<R>: Send + Sync {
    /// Name of the backing table, used for logs and metric labels.
    fn table(&self) -> &'static str;

    /// List all records whose validation closed before the watermark.
    async fn list_closed_before(&self, watermark: DateTime<Utc>) -> DbResult<Vec<R>>;

    /// Count records whose validation closed before the watermark.
    async fn count_closed_before(&self, watermark: DateTime<Utc>) -> DbResult<i64>;

    // ==================== Retention Operations ====================

    /// Delete every record whose validation closed before the watermark.
    ///
    /// Deletes in batches to avoid locking the database.
    /// Returns the total number of records deleted.
    async fn delete_closed_before(
        &self,
        watermark: DateTime<Utc>,
        batch_size: u32,
    ) -> DbResult<u64>;

    /// Count all records in the table.
    async fn count(&self) -> DbResult<i64>;
}

/// Append-only archive of one category in the archive database.
///
/// No uniqueness is enforced on the natural key: a retried run may insert
/// the same record twice.
#[async_trait]
pub trait ArchiveRepo<R>: Send + Sync {
    /// Name of the backing table, used for logs and metric labels.
    fn table(&self) -> &'static str;

    /// Insert a copy of the record.
    async fn insert(&self, record: &R) -> DbResult<()>;

    /// Count all records in the table.
    async fn count(&self) -> DbResult<i64>;
}
