use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use super::error::{ArchiveError, WatermarkError};
use crate::db::QueueStatusRepo;

/// Cutoff below which every intake queue has drained and the minimum record
/// lifetime has elapsed.
///
/// `W = min({ last_emptied(q) } ∪ { now - minimum_lifetime })`. The minimum
/// keeps the watermark safe against the slowest queue. A required queue with
/// no report counts as never emptied, pinning the watermark to the epoch.
pub fn compute_watermark(
    last_emptied: &HashMap<String, DateTime<Utc>>,
    required_queues: &[String],
    minimum_lifetime: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, WatermarkError> {
    if last_emptied.is_empty() {
        return Err(WatermarkError::NoQueueStatus);
    }

    let mut watermark = now
        .checked_sub_signed(minimum_lifetime)
        .ok_or(WatermarkError::LifetimeOutOfRange(minimum_lifetime))?;

    for queue in required_queues {
        if !last_emptied.contains_key(queue) {
            tracing::warn!(
                queue = %queue,
                "Intake queue has never reported being emptied; nothing will be archived"
            );
            watermark = DateTime::UNIX_EPOCH;
        }
    }

    for emptied_at in last_emptied.values() {
        watermark = watermark.min(*emptied_at);
    }

    Ok(watermark)
}

/// Reads queue status and derives the watermark for one run.
pub struct WatermarkCalculator {
    queue_status: Arc<dyn QueueStatusRepo>,
    required_queues: Vec<String>,
    minimum_lifetime: chrono::Duration,
    timeout: Duration,
}

impl WatermarkCalculator {
    pub fn new(
        queue_status: Arc<dyn QueueStatusRepo>,
        required_queues: Vec<String>,
        minimum_lifetime: chrono::Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            queue_status,
            required_queues,
            minimum_lifetime,
            timeout,
        }
    }

    pub async fn watermark(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ArchiveError> {
        let last_emptied =
            match tokio::time::timeout(self.timeout, self.queue_status.last_emptied()).await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => return Err(WatermarkError::QueueStatus(e).into()),
                Err(_) => {
                    return Err(ArchiveError::Timeout {
                        operation: "last_emptied",
                        store: "intake_queue_status",
                        timeout: self.timeout,
                    });
                }
            };

        let watermark = compute_watermark(
            &last_emptied,
            &self.required_queues,
            self.minimum_lifetime,
            now,
        )?;

        tracing::debug!(
            %watermark,
            queues = last_emptied.len(),
            "Computed archive watermark"
        );

        Ok(watermark)
    }
}
