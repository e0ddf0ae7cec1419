//! Background worker that runs the archive workflow on a fixed interval.

use std::sync::Arc;

use uuid::Uuid;

use super::workflow::ArchiveWorkflow;

/// Starts the archive worker as a background task.
///
/// Each pass gets a fresh job id. Failures are logged and retried on the next
/// tick; the worker runs until the task is cancelled.
pub async fn start_archive_worker(
    workflow: Arc<ArchiveWorkflow>,
    server_name: String,
    worker_name: String,
) {
    let config = workflow.config();
    let dry_run_msg = if config.dry_run { " (DRY RUN)" } else { "" };

    tracing::info!(
        interval_secs = config.interval_secs,
        minimum_signature_lifetime_days = config.minimum_signature_lifetime_days,
        archive_enabled = config.archive_invalid_signatures_enabled,
        lock = config.lock.enabled,
        dry_run = config.dry_run,
        server = %server_name,
        worker = %worker_name,
        "Starting archive worker{}",
        dry_run_msg
    );

    let interval = config.interval();

    loop {
        let job_id = Uuid::new_v4();
        match workflow.execute(job_id, &server_name, &worker_name).await {
            Ok(result) if !result.skipped && !result.has_changes() && !result.dry_run => {
                tracing::debug!(%job_id, "Archive run complete, nothing to move");
            }
            // Summary already logged by the workflow
            Ok(_) | Err(_) => {}
        }

        tokio::time::sleep(interval).await;
    }
}
