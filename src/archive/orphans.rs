use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use super::{
    error::{ArchiveError, bounded},
    mover::record_size,
};
use crate::{
    db::{ArchiveRepo, ValidationRepo},
    models::{RecordCategory, Validation},
    observability::{audit, metrics},
};

/// Result of archiving orphaned validations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrphanArchival {
    /// Secret keys whose every orphaned row reached the archive.
    pub archived_keys: BTreeSet<String>,
    /// Rows inserted into the archive.
    pub archived_rows: u64,
    /// Rows that failed to archive. Their keys are left out of `archived_keys`.
    pub failed_rows: u64,
}

/// Finds validations that never matched a pending signature and retires them.
///
/// A validation only counts as orphaned once it is older than the watermark.
/// Before that its signature may still be in flight on the other intake queue.
pub struct OrphanReconciler {
    validations: Arc<dyn ValidationRepo>,
    archive: Arc<dyn ArchiveRepo<Validation>>,
    timeout: Duration,
    batch_size: u32,
}

impl OrphanReconciler {
    pub fn new(
        validations: Arc<dyn ValidationRepo>,
        archive: Arc<dyn ArchiveRepo<Validation>>,
        timeout: Duration,
        batch_size: u32,
    ) -> Self {
        Self {
            validations,
            archive,
            timeout,
            batch_size,
        }
    }

    /// Validations closed before the watermark with no pending signature
    /// sharing their secret key.
    pub async fn find_orphans(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<Vec<Validation>, ArchiveError> {
        bounded(
            "list_orphaned_before",
            self.validations.table(),
            self.timeout,
            self.validations.list_orphaned_before(watermark),
        )
        .await
    }

    pub async fn find_orphan_keys(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<BTreeSet<String>, ArchiveError> {
        Ok(self
            .find_orphans(watermark)
            .await?
            .into_iter()
            .map(|v| v.secret_validation_key)
            .collect())
    }

    pub async fn count_orphans(&self, watermark: DateTime<Utc>) -> Result<u64, ArchiveError> {
        let count = bounded(
            "count_orphaned_before",
            self.validations.table(),
            self.timeout,
            self.validations.count_orphaned_before(watermark),
        )
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Copy every orphan into the archive.
    ///
    /// A failed or timed-out insert is logged and counted, and its key is held
    /// back so the row survives until the next run. Only the lookup itself
    /// failing aborts the step.
    pub async fn archive_orphans(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<OrphanArchival, ArchiveError> {
        let store = self.archive.table();
        let orphans = self.find_orphans(watermark).await?;

        let mut succeeded = BTreeSet::new();
        let mut failed_keys = BTreeSet::new();
        let mut result = OrphanArchival::default();

        for orphan in &orphans {
            match bounded("archive_insert", store, self.timeout, self.archive.insert(orphan)).await
            {
                Ok(()) => {
                    result.archived_rows += 1;
                    succeeded.insert(orphan.secret_validation_key.clone());
                }
                Err(e) => {
                    result.failed_rows += 1;
                    failed_keys.insert(orphan.secret_validation_key.clone());
                    metrics::record_archive_error("archive_orphan");
                    audit::orphan_archive_failed(orphan.vid, store, &e.to_string());
                }
            }
        }

        result.archived_keys = succeeded.difference(&failed_keys).cloned().collect();

        metrics::record_items_added(store, result.archived_rows);
        record_size(store, self.timeout, self.archive.count()).await;
        audit::archived(
            RecordCategory::OrphanedValidations,
            store,
            result.archived_rows,
            watermark,
        );

        Ok(result)
    }

    /// Delete orphans from the validation table.
    ///
    /// With `keys`, rows with those keys closed before the watermark are
    /// deleted and nothing is re-queried. Without, the orphan set is
    /// recomputed at the watermark and deleted. Rows closed at or after the
    /// watermark are never deleted, even when they share an archived key.
    /// No keys is a zero-count result.
    pub async fn delete_orphans(
        &self,
        watermark: DateTime<Utc>,
        keys: Option<&BTreeSet<String>>,
    ) -> Result<u64, ArchiveError> {
        let store = self.validations.table();
        let recomputed;
        let keys = match keys {
            Some(keys) => keys,
            None => {
                recomputed = self.find_orphan_keys(watermark).await?;
                &recomputed
            }
        };

        let deleted = if keys.is_empty() {
            0
        } else {
            bounded(
                "delete_by_secret_keys",
                store,
                self.timeout,
                self.validations
                    .delete_by_secret_keys(keys, watermark, self.batch_size),
            )
            .await?
        };

        metrics::record_items_removed(store, deleted);
        record_size(store, self.timeout, self.validations.count()).await;
        audit::deleted(RecordCategory::OrphanedValidations, store, deleted, watermark);

        Ok(deleted)
    }
}
