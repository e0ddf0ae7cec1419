use std::{future::Future, time::Duration};

use crate::db::{DbError, DbResult};

/// Failure to derive a safe watermark.
#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    #[error("Queue status unavailable: {0}")]
    QueueStatus(#[source] DbError),

    #[error("No intake queue has reported a last-emptied time")]
    NoQueueStatus,

    #[error("Minimum signature lifetime {0} reaches before the earliest representable time")]
    LifetimeOutOfRange(chrono::Duration),
}

/// Errors that abort an archive run.
///
/// Each one leaves the steps that already completed in place and skips the rest.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Cannot compute watermark: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("Store operation {operation} on {store} failed: {source}")]
    Store {
        operation: &'static str,
        store: &'static str,
        #[source]
        source: DbError,
    },

    #[error("Store operation {operation} on {store} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        store: &'static str,
        timeout: Duration,
    },
}

impl ArchiveError {
    /// Label of the failing step, for metrics.
    pub fn step(&self) -> &'static str {
        match self {
            ArchiveError::Watermark(_) => "watermark",
            ArchiveError::Store { operation, .. } | ArchiveError::Timeout { operation, .. } => {
                operation
            }
        }
    }
}

/// Run a store call under `timeout`, tagging failures with the operation and store.
pub(crate) async fn bounded<T>(
    operation: &'static str,
    store: &'static str,
    timeout: Duration,
    call: impl Future<Output = DbResult<T>>,
) -> Result<T, ArchiveError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(ArchiveError::Store {
            operation,
            store,
            source,
        }),
        Err(_) => Err(ArchiveError::Timeout {
            operation,
            store,
            timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_value_through() {
        let value = bounded("count", "validations", Duration::from_secs(1), async {
            Ok::<_, DbError>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_tags_store_errors() {
        let err = bounded(
            "archive_insert",
            "orphaned_validations",
            Duration::from_secs(1),
            async { Err::<(), _>(DbError::Internal("disk full".into())) },
        )
        .await
        .unwrap_err();

        assert_eq!(err.step(), "archive_insert");
        let msg = err.to_string();
        assert!(msg.contains("orphaned_validations"), "{msg}");
        assert!(msg.contains("disk full"), "{msg}");
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let err = bounded(
            "delete_closed_before",
            "pending_signatures",
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, DbError>(())
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ArchiveError::Timeout {
                store: "pending_signatures",
                ..
            }
        ));
    }

    #[test]
    fn test_watermark_step_label() {
        let err = ArchiveError::from(WatermarkError::NoQueueStatus);
        assert_eq!(err.step(), "watermark");
    }
}
