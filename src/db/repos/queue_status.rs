use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::DbResult;

/// Per-queue "last emptied" timestamps reported by the intake side.
#[async_trait]
pub trait QueueStatusRepo: Send + Sync {
    /// The last instant each intake queue was observed empty.
    async fn last_emptied(&self) -> DbResult<HashMap<String, DateTime<Utc>>>;

    /// Record that `queue` was observed empty at `at`.
    async fn mark_emptied(&self, queue: &str, at: DateTime<Utc>) -> DbResult<()>;
}
