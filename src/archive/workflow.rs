use std::{collections::BTreeMap, sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::{
    error::{ArchiveError, bounded},
    mover::{MoveOutcome, RecordMover, TwoPassMover},
    orphans::OrphanReconciler,
    status::{StatusCode, WorkflowOptions},
    watermark::WatermarkCalculator,
};
use crate::{
    config::ArchiveConfig,
    db::{ArchiveStores, JobLeaseRepo, ProcessingStores},
    models::RecordCategory,
    observability::{audit, metrics},
};

/// Results from a single archive run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRunResult {
    /// Watermark the run used. `None` when the run was skipped.
    pub watermark: Option<DateTime<Utc>>,
    /// Another holder owned the job lease, so nothing ran.
    pub skipped: bool,
    pub dry_run: bool,
    pub invalid_signatures: MoveOutcome,
    pub orphaned_validations: MoveOutcome,
    pub processed_signatures: MoveOutcome,
    pub processed_validations: MoveOutcome,
    /// Orphaned validations that failed to archive and were kept.
    pub orphans_failed: u64,
    /// Records a dry run found eligible, per category.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub eligible: BTreeMap<RecordCategory, u64>,
    pub duration_ms: u64,
}

impl ArchiveRunResult {
    pub fn outcome(&self, category: RecordCategory) -> &MoveOutcome {
        match category {
            RecordCategory::InvalidSignatures => &self.invalid_signatures,
            RecordCategory::OrphanedValidations => &self.orphaned_validations,
            RecordCategory::ProcessedSignatures => &self.processed_signatures,
            RecordCategory::ProcessedValidations => &self.processed_validations,
        }
    }

    /// Total number of records archived across all categories.
    pub fn total_archived(&self) -> u64 {
        RecordCategory::ALL
            .iter()
            .map(|c| self.outcome(*c).archived)
            .sum()
    }

    /// Total number of records deleted across all categories.
    pub fn total_deleted(&self) -> u64 {
        RecordCategory::ALL
            .iter()
            .map(|c| self.outcome(*c).deleted)
            .sum()
    }

    pub fn has_changes(&self) -> bool {
        self.total_archived() > 0 || self.total_deleted() > 0
    }
}

/// Runs the archive-then-delete sequence over all four record categories.
///
/// Built once from explicit store handles and a resolved [`ArchiveConfig`];
/// the configuration does not change between or during runs.
pub struct ArchiveWorkflow {
    config: ArchiveConfig,
    watermark: WatermarkCalculator,
    invalid_signatures: Arc<dyn RecordMover>,
    orphans: OrphanReconciler,
    processed_signatures: Arc<dyn RecordMover>,
    processed_validations: Arc<dyn RecordMover>,
    job_leases: Arc<dyn JobLeaseRepo>,
}

impl ArchiveWorkflow {
    pub fn new(
        processing: &ProcessingStores,
        archive: &ArchiveStores,
        config: ArchiveConfig,
    ) -> Self {
        let timeout = config.store_timeout();
        let batch_size = config.batch_size;

        Self {
            watermark: WatermarkCalculator::new(
                processing.queue_status.clone(),
                config.intake_queues.clone(),
                config.minimum_signature_lifetime(),
                timeout,
            ),
            invalid_signatures: Arc::new(TwoPassMover::new(
                RecordCategory::InvalidSignatures,
                processing.pending_signatures.clone(),
                archive.not_validated_signatures.clone(),
                timeout,
                batch_size,
            )),
            orphans: OrphanReconciler::new(
                processing.validations.clone(),
                archive.orphaned_validations.clone(),
                timeout,
                batch_size,
            ),
            processed_signatures: Arc::new(TwoPassMover::new(
                RecordCategory::ProcessedSignatures,
                processing.processed_signatures.clone(),
                archive.processed_signatures.clone(),
                timeout,
                batch_size,
            )),
            processed_validations: Arc::new(TwoPassMover::new(
                RecordCategory::ProcessedValidations,
                processing.processed_validations.clone(),
                archive.processed_validations.clone(),
                timeout,
                batch_size,
            )),
            job_leases: processing.job_leases.clone(),
            config,
        }
    }

    /// Replace the mover used for one of the three plain categories.
    ///
    /// Orphaned validations always go through the reconciler; passing that
    /// category leaves the workflow unchanged.
    pub fn with_mover(mut self, mover: Arc<dyn RecordMover>) -> Self {
        match mover.category() {
            RecordCategory::InvalidSignatures => self.invalid_signatures = mover,
            RecordCategory::ProcessedSignatures => self.processed_signatures = mover,
            RecordCategory::ProcessedValidations => self.processed_validations = mover,
            RecordCategory::OrphanedValidations => {
                tracing::warn!("Orphaned validations cannot use a custom mover, ignoring")
            }
        }
        self
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Run one invocation and map the outcome to a status code.
    ///
    /// `options` is accepted for forward compatibility and currently ignored.
    pub async fn run_archive_workflow(
        &self,
        job_id: Uuid,
        server_name: &str,
        worker_name: &str,
        options: &WorkflowOptions,
    ) -> StatusCode {
        let _ = options;
        match self.execute(job_id, server_name, worker_name).await {
            Ok(_) => StatusCode::Ok,
            Err(_) => StatusCode::ServerError,
        }
    }

    /// Run one invocation inside a span, recording run metrics and logging
    /// the summary.
    pub async fn execute(
        &self,
        job_id: Uuid,
        server_name: &str,
        worker_name: &str,
    ) -> Result<ArchiveRunResult, ArchiveError> {
        let span = tracing::info_span!(
            "archive_workflow",
            job = %self.config.job_name,
            %job_id,
            server = server_name,
            worker = worker_name,
        );

        async {
            let started = Instant::now();
            let result = self.run(&format!("{server_name}/{worker_name}/{job_id}")).await;
            let elapsed = started.elapsed();

            match &result {
                Ok(run) if run.skipped => {
                    metrics::record_archive_run("skipped", elapsed.as_secs_f64());
                }
                Ok(run) => {
                    metrics::record_archive_run(StatusCode::Ok.as_str(), elapsed.as_secs_f64());
                    tracing::info!(
                        watermark = ?run.watermark,
                        archived = run.total_archived(),
                        deleted = run.total_deleted(),
                        orphans_failed = run.orphans_failed,
                        dry_run = run.dry_run,
                        duration_ms = run.duration_ms,
                        "Archive run complete"
                    );
                }
                Err(e) => {
                    metrics::record_archive_run(
                        StatusCode::ServerError.as_str(),
                        elapsed.as_secs_f64(),
                    );
                    metrics::record_archive_error(e.step());
                    tracing::error!(error = %e, step = e.step(), "Archive run failed");
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    /// Take the job lease if locking is enabled, run, and release it.
    async fn run(&self, holder: &str) -> Result<ArchiveRunResult, ArchiveError> {
        let now = Utc::now();

        if !self.config.lock.enabled {
            return self.run_at(now).await;
        }

        let timeout = self.config.store_timeout();
        let acquired = bounded(
            "acquire_lease",
            "job_leases",
            timeout,
            self.job_leases.try_acquire(
                &self.config.job_name,
                holder,
                now,
                self.config.lock.lease_ttl(),
            ),
        )
        .await?;

        if !acquired {
            tracing::info!(
                job = %self.config.job_name,
                "Another worker holds the archive lease, skipping this run"
            );
            return Ok(ArchiveRunResult {
                skipped: true,
                ..Default::default()
            });
        }

        let result = self.run_at(now).await;

        if let Err(e) = bounded(
            "release_lease",
            "job_leases",
            timeout,
            self.job_leases.release(&self.config.job_name, holder),
        )
        .await
        {
            tracing::warn!(error = %e, "Failed to release archive lease; it expires on its own");
        }

        result
    }

    /// Run every step against the watermark derived at `now`.
    pub(crate) async fn run_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ArchiveRunResult, ArchiveError> {
        let started = Instant::now();
        let watermark = self.watermark.watermark(now).await?;

        let mut result = if self.config.dry_run {
            self.count_eligible(watermark).await?
        } else {
            self.transition_all(watermark).await?
        };

        result.watermark = Some(watermark);
        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(result)
    }

    /// Compute the watermark the next run would use.
    pub async fn current_watermark(&self) -> Result<DateTime<Utc>, ArchiveError> {
        self.watermark.watermark(Utc::now()).await
    }

    async fn transition_all(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<ArchiveRunResult, ArchiveError> {
        let archive = self.config.archive_invalid_signatures_enabled;
        let mut result = ArchiveRunResult::default();

        result.invalid_signatures = self.invalid_signatures.transition(watermark, archive).await?;

        result.orphaned_validations = if archive {
            let archival = self.orphans.archive_orphans(watermark).await?;
            result.orphans_failed = archival.failed_rows;
            let deleted = self
                .orphans
                .delete_orphans(watermark, Some(&archival.archived_keys))
                .await?;
            MoveOutcome {
                archived: archival.archived_rows,
                deleted,
            }
        } else {
            MoveOutcome {
                archived: 0,
                deleted: self.orphans.delete_orphans(watermark, None).await?,
            }
        };

        result.processed_signatures = self
            .processed_signatures
            .transition(watermark, archive)
            .await?;
        result.processed_validations = self
            .processed_validations
            .transition(watermark, archive)
            .await?;

        Ok(result)
    }

    async fn count_eligible(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<ArchiveRunResult, ArchiveError> {
        let mut eligible = BTreeMap::new();

        for mover in [
            &self.invalid_signatures,
            &self.processed_signatures,
            &self.processed_validations,
        ] {
            let count = mover.count_closed_before(watermark).await?;
            audit::eligible(
                mover.category(),
                mover.category().processing_table(),
                count,
                watermark,
            );
            eligible.insert(mover.category(), count);
        }

        let orphans = self.orphans.count_orphans(watermark).await?;
        audit::eligible(
            RecordCategory::OrphanedValidations,
            RecordCategory::OrphanedValidations.processing_table(),
            orphans,
            watermark,
        );
        eligible.insert(RecordCategory::OrphanedValidations, orphans);

        Ok(ArchiveRunResult {
            dry_run: true,
            eligible,
            ..Default::default()
        })
    }
}
