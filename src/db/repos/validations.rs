use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{db::error::DbResult, models::Validation};

/// Orphan queries over the `validations` table of the processing database.
#[async_trait]
pub trait ValidationRepo: Send + Sync {
    fn table(&self) -> &'static str;

    /// List validations closed before the watermark that have no pending
    /// signature sharing their secret validation key.
    async fn list_orphaned_before(&self, watermark: DateTime<Utc>) -> DbResult<Vec<Validation>>;

    /// Count the rows `list_orphaned_before` would return.
    async fn count_orphaned_before(&self, watermark: DateTime<Utc>) -> DbResult<i64>;

    /// Delete validations closed before the watermark whose secret validation
    /// key is in `keys`, `batch_size` keys per statement. Rows sharing a key
    /// but closed at or after the watermark are kept.
    /// Returns the total number of records deleted.
    async fn delete_by_secret_keys(
        &self,
        keys: &BTreeSet<String>,
        watermark: DateTime<Utc>,
        batch_size: u32,
    ) -> DbResult<u64>;

    /// Count all validations.
    async fn count(&self) -> DbResult<i64>;
}
