use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::{ArchiveError, bounded};
use crate::{
    db::{ArchiveRepo, DbResult, ProcessingRepo},
    models::RecordCategory,
    observability::{audit, metrics},
};

/// Counts from moving one category.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub archived: u64,
    pub deleted: u64,
}

/// Moves records of one category from processing into archive storage.
#[async_trait]
pub trait RecordMover: Send + Sync {
    fn category(&self) -> RecordCategory;

    /// Copy every record closed before the watermark into the archive.
    /// Returns the number of records copied.
    async fn archive_closed_before(&self, watermark: DateTime<Utc>) -> Result<u64, ArchiveError>;

    /// Delete every record closed before the watermark from processing storage.
    async fn delete_closed_before(&self, watermark: DateTime<Utc>) -> Result<u64, ArchiveError>;

    /// Number of records a transition at this watermark would touch.
    async fn count_closed_before(&self, watermark: DateTime<Utc>) -> Result<u64, ArchiveError>;

    /// Archive (when `archive` is set) and then delete. A failed archive
    /// step returns before anything is deleted.
    async fn transition(
        &self,
        watermark: DateTime<Utc>,
        archive: bool,
    ) -> Result<MoveOutcome, ArchiveError> {
        let archived = if archive {
            self.archive_closed_before(watermark).await?
        } else {
            0
        };
        let deleted = self.delete_closed_before(watermark).await?;
        Ok(MoveOutcome { archived, deleted })
    }
}

/// Select-and-insert followed by an independent delete-by-predicate.
///
/// Not transactional: a crash between the two passes leaves archived rows in
/// processing storage, and the next run archives them again.
pub struct TwoPassMover<R> {
    category: RecordCategory,
    source: Arc<dyn ProcessingRepo<R>>,
    target: Arc<dyn ArchiveRepo<R>>,
    timeout: Duration,
    batch_size: u32,
}

impl<R> TwoPassMover<R> {
    pub fn new(
        category: RecordCategory,
        source: Arc<dyn ProcessingRepo<R>>,
        target: Arc<dyn ArchiveRepo<R>>,
        timeout: Duration,
        batch_size: u32,
    ) -> Self {
        Self {
            category,
            source,
            target,
            timeout,
            batch_size,
        }
    }
}

#[async_trait]
impl<R: Send + Sync + 'static> RecordMover for TwoPassMover<R> {
    fn category(&self) -> RecordCategory {
        self.category
    }

    async fn archive_closed_before(&self, watermark: DateTime<Utc>) -> Result<u64, ArchiveError> {
        let store = self.target.table();
        let records = bounded(
            "list_closed_before",
            self.source.table(),
            self.timeout,
            self.source.list_closed_before(watermark),
        )
        .await?;

        let mut archived: u64 = 0;
        for record in &records {
            let inserted = bounded(
                "archive_insert",
                store,
                self.timeout,
                self.target.insert(record),
            )
            .await;
            if let Err(e) = inserted {
                metrics::record_items_added(store, archived);
                return Err(e);
            }
            archived += 1;
        }

        metrics::record_items_added(store, archived);
        record_size(store, self.timeout, self.target.count()).await;
        audit::archived(self.category, store, archived, watermark);

        Ok(archived)
    }

    async fn delete_closed_before(&self, watermark: DateTime<Utc>) -> Result<u64, ArchiveError> {
        let store = self.source.table();
        let deleted = bounded(
            "delete_closed_before",
            store,
            self.timeout,
            self.source.delete_closed_before(watermark, self.batch_size),
        )
        .await?;

        metrics::record_items_removed(store, deleted);
        record_size(store, self.timeout, self.source.count()).await;
        audit::deleted(self.category, store, deleted, watermark);

        Ok(deleted)
    }

    async fn count_closed_before(&self, watermark: DateTime<Utc>) -> Result<u64, ArchiveError> {
        let count = bounded(
            "count_closed_before",
            self.source.table(),
            self.timeout,
            self.source.count_closed_before(watermark),
        )
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Publish a table's row count. A failed count is logged and otherwise ignored.
pub(crate) async fn record_size(
    store: &'static str,
    timeout: Duration,
    count: impl std::future::Future<Output = DbResult<i64>>,
) {
    match bounded("count", store, timeout, count).await {
        Ok(size) => metrics::record_store_size(store, size),
        Err(e) => tracing::warn!(store, error = %e, "Failed to snapshot store size"),
    }
}
