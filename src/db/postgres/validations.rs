use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::common;
use crate::{
    db::{
        error::DbResult,
        repos::{ArchiveRepo, ProcessingRepo, ValidationRepo},
    },
    models::{ProcessedValidation, RecordCategory, Validation},
};

const VALIDATION_COLUMNS: &str = "vid, secret_validation_key, timestamp_received_validation, \
     timestamp_validation_close, client_ip, petition_id";

/// `VALIDATION_COLUMNS` qualified with the `v` alias used by the orphan anti-join.
const ORPHAN_COLUMNS: &str = "v.vid, v.secret_validation_key, v.timestamp_received_validation, \
     v.timestamp_validation_close, v.client_ip, v.petition_id";

fn validation_from_row(row: &PgRow) -> Validation {
    Validation {
        vid: row.get("vid"),
        secret_validation_key: row.get("secret_validation_key"),
        timestamp_received_validation: row.get("timestamp_received_validation"),
        timestamp_validation_close: row.get("timestamp_validation_close"),
        client_ip: row.get("client_ip"),
        petition_id: row.get("petition_id"),
    }
}

/// Validation rows: `validations` or `orphaned_validations`.
pub struct PostgresValidationStore {
    write_pool: PgPool,
    read_pool: PgPool,
    table: &'static str,
}

impl PostgresValidationStore {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>, table: &'static str) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
            table,
        }
    }

    /// Anti-join of this table against `pending_signatures`.
    fn orphan_predicate(&self) -> String {
        format!(
            "v.timestamp_validation_close < $1 AND NOT EXISTS ( \
                 SELECT 1 FROM {pending} s \
                 WHERE s.secret_validation_key = v.secret_validation_key \
             )",
            pending = RecordCategory::InvalidSignatures.processing_table()
        )
    }
}

#[async_trait]
impl ValidationRepo for PostgresValidationStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn list_orphaned_before(&self, watermark: DateTime<Utc>) -> DbResult<Vec<Validation>> {
        // Orphan decisions must see the primary: a replica may still miss a pending signature.
        let rows = sqlx::query(&format!(
            "SELECT {ORPHAN_COLUMNS} FROM {} v WHERE {} ORDER BY v.timestamp_validation_close",
            self.table,
            self.orphan_predicate()
        ))
        .bind(watermark)
        .fetch_all(&self.write_pool)
        .await?;

        Ok(rows.iter().map(validation_from_row).collect())
    }

    async fn count_orphaned_before(&self, watermark: DateTime<Utc>) -> DbResult<i64> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM {} v WHERE {}",
            self.table,
            self.orphan_predicate()
        ))
        .bind(watermark)
        .fetch_one(&self.read_pool)
        .await?;
        Ok(row.get("count"))
    }

    async fn delete_by_secret_keys(
        &self,
        keys: &BTreeSet<String>,
        watermark: DateTime<Utc>,
        batch_size: u32,
    ) -> DbResult<u64> {
        let keys: Vec<String> = keys.iter().cloned().collect();
        let query = format!(
            "DELETE FROM {} WHERE secret_validation_key = ANY($1) \
             AND timestamp_validation_close < $2",
            self.table
        );
        let mut total_deleted: u64 = 0;

        for chunk in keys.chunks(batch_size.max(1) as usize) {
            total_deleted += sqlx::query(&query)
                .bind(chunk)
                .bind(watermark)
                .execute(&self.write_pool)
                .await?
                .rows_affected();
        }

        Ok(total_deleted)
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.read_pool, self.table).await
    }
}

#[async_trait]
impl ArchiveRepo<Validation> for PostgresValidationStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn insert(&self, record: &Validation) -> DbResult<()> {
        sqlx::query(&format!(
            "INSERT INTO {} ({VALIDATION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)",
            self.table
        ))
        .bind(record.vid)
        .bind(&record.secret_validation_key)
        .bind(record.timestamp_received_validation)
        .bind(record.timestamp_validation_close)
        .bind(&record.client_ip)
        .bind(&record.petition_id)
        .execute(&self.write_pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.read_pool, self.table).await
    }
}

/// Processed validation rows: `processed_validations` or `archived_processed_validations`.
pub struct PostgresProcessedValidationStore {
    write_pool: PgPool,
    read_pool: PgPool,
    table: &'static str,
}

impl PostgresProcessedValidationStore {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>, table: &'static str) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
            table,
        }
    }
}

#[async_trait]
impl ProcessingRepo<ProcessedValidation> for PostgresProcessedValidationStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn list_closed_before(
        &self,
        watermark: DateTime<Utc>,
    ) -> DbResult<Vec<ProcessedValidation>> {
        let rows = sqlx::query(&format!(
            "SELECT {VALIDATION_COLUMNS}, timestamp_processed_validation FROM {} \
             WHERE timestamp_validation_close < $1 ORDER BY timestamp_validation_close",
            self.table
        ))
        .bind(watermark)
        .fetch_all(&self.write_pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ProcessedValidation {
                validation: validation_from_row(row),
                timestamp_processed_validation: row.get("timestamp_processed_validation"),
            })
            .collect())
    }

    async fn count_closed_before(&self, watermark: DateTime<Utc>) -> DbResult<i64> {
        common::count_closed_before(&self.read_pool, self.table, watermark).await
    }

    async fn delete_closed_before(
        &self,
        watermark: DateTime<Utc>,
        batch_size: u32,
    ) -> DbResult<u64> {
        common::delete_closed_before(&self.write_pool, self.table, watermark, batch_size).await
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.read_pool, self.table).await
    }
}

#[async_trait]
impl ArchiveRepo<ProcessedValidation> for PostgresProcessedValidationStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn insert(&self, record: &ProcessedValidation) -> DbResult<()> {
        let validation = &record.validation;
        sqlx::query(&format!(
            "INSERT INTO {} ({VALIDATION_COLUMNS}, timestamp_processed_validation) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.table
        ))
        .bind(validation.vid)
        .bind(&validation.secret_validation_key)
        .bind(validation.timestamp_received_validation)
        .bind(validation.timestamp_validation_close)
        .bind(&validation.client_ip)
        .bind(&validation.petition_id)
        .bind(record.timestamp_processed_validation)
        .execute(&self.write_pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.read_pool, self.table).await
    }
}
