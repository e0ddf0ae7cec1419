//! Audit trail of archive transitions.
//!
//! Every event is a `tracing` event with target `audit` carrying `category`,
//! `store`, `count` and `watermark` fields. Routine turnover logs at `info`;
//! orphaned validations log at `warn` with `severity = "alert"` since they
//! point at forged or stale validation links.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::RecordCategory;

/// Records copied into an archive table.
pub fn archived(category: RecordCategory, store: &str, count: u64, watermark: DateTime<Utc>) {
    match category {
        RecordCategory::OrphanedValidations => tracing::warn!(
            target: "audit",
            severity = "alert",
            category = %category,
            store,
            count,
            %watermark,
            "Archived {count} orphaned validations"
        ),
        _ => tracing::info!(
            target: "audit",
            category = %category,
            store,
            count,
            %watermark,
            "Archived {count} {category}"
        ),
    }
}

/// Records removed from a processing table.
pub fn deleted(category: RecordCategory, store: &str, count: u64, watermark: DateTime<Utc>) {
    match category {
        RecordCategory::OrphanedValidations => tracing::warn!(
            target: "audit",
            severity = "alert",
            category = %category,
            store,
            count,
            %watermark,
            "Deleted {count} orphaned validations"
        ),
        _ => tracing::info!(
            target: "audit",
            category = %category,
            store,
            count,
            %watermark,
            "Deleted {count} {category}"
        ),
    }
}

/// Records a dry run would move.
pub fn eligible(category: RecordCategory, store: &str, count: u64, watermark: DateTime<Utc>) {
    tracing::info!(
        target: "audit",
        category = %category,
        store,
        count,
        %watermark,
        dry_run = true,
        "{count} {category} eligible for archival"
    );
}

/// An orphaned validation that could not be archived and stays in processing storage.
pub fn orphan_archive_failed(vid: Uuid, store: &str, error: &str) {
    tracing::error!(
        target: "audit",
        severity = "alert",
        category = %RecordCategory::OrphanedValidations,
        store,
        %vid,
        error,
        "Failed to archive orphaned validation, keeping it for the next run"
    );
}
