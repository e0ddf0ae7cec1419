use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use super::common::{self, parse_uuid};
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

fn validation_from_row(row: &SqliteRow) -> DbResult<Validation> {
    Ok(Validation {
        vid: parse_uuid(&row.get::<String, _>("vid"))?,
        secret_validation_key: row.get("secret_validation_key"),
        timestamp_received_validation: row.get("timestamp_received_validation"),
        timestamp_validation_close: row.get("timestamp_validation_close"),
        client_ip: row.get("client_ip"),
        petition_id: row.get("petition_id"),
    })
}

/// Validation rows: `validations` or `orphaned_validations`.
pub struct SqliteValidationStore {
    pool: SqlitePool,
    table: &'static str,
}

impl SqliteValidationStore {
    pub fn new(pool: SqlitePool, table: &'static str) -> Self {
        Self { pool, table }
    }

    /// Anti-join of this table against `pending_signatures`.
    fn orphan_predicate(&self) -> String {
        format!(
            "v.timestamp_validation_close < ? AND NOT EXISTS ( \
                 SELECT 1 FROM {pending} s \
                 WHERE s.secret_validation_key = v.secret_validation_key \
             )",
            pending = RecordCategory::InvalidSignatures.processing_table()
        )
    }
}

#[async_trait]
impl ValidationRepo for SqliteValidationStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn list_orphaned_before(&self, watermark: DateTime<Utc>) -> DbResult<Vec<Validation>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORPHAN_COLUMNS} FROM {} v WHERE {} ORDER BY v.timestamp_validation_close",
            self.table,
            self.orphan_predicate()
        ))
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(validation_from_row).collect()
    }

    async fn count_orphaned_before(&self, watermark: DateTime<Utc>) -> DbResult<i64> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM {} v WHERE {}",
            self.table,
            self.orphan_predicate()
        ))
        .bind(watermark)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("count"))
    }

    async fn delete_by_secret_keys(
        &self,
        keys: &BTreeSet<String>,
        watermark: DateTime<Utc>,
        batch_size: u32,
    ) -> DbResult<u64> {
        let keys: Vec<&String> = keys.iter().collect();
        let mut total_deleted: u64 = 0;

        for chunk in keys.chunks(batch_size.max(1) as usize) {
            let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let query = format!(
                "DELETE FROM {} WHERE timestamp_validation_close < ? \
                 AND secret_validation_key IN ({})",
                self.table, placeholders
            );

            let mut query_builder = sqlx::query(&query).bind(watermark);
            for key in chunk {
                query_builder = query_builder.bind(key.as_str());
            }

            total_deleted += query_builder.execute(&self.pool).await?.rows_affected();
        }

        Ok(total_deleted)
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.pool, self.table).await
    }
}

#[async_trait]
impl ArchiveRepo<Validation> for SqliteValidationStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn insert(&self, record: &Validation) -> DbResult<()> {
        sqlx::query(&format!(
            "INSERT INTO {} ({VALIDATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)",
            self.table
        ))
        .bind(record.vid.to_string())
        .bind(&record.secret_validation_key)
        .bind(record.timestamp_received_validation)
        .bind(record.timestamp_validation_close)
        .bind(&record.client_ip)
        .bind(&record.petition_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.pool, self.table).await
    }
}

/// Processed validation rows: `processed_validations` or `archived_processed_validations`.
pub struct SqliteProcessedValidationStore {
    pool: SqlitePool,
    table: &'static str,
}

impl SqliteProcessedValidationStore {
    pub fn new(pool: SqlitePool, table: &'static str) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl ProcessingRepo<ProcessedValidation> for SqliteProcessedValidationStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn list_closed_before(
        &self,
        watermark: DateTime<Utc>,
    ) -> DbResult<Vec<ProcessedValidation>> {
        let rows = sqlx::query(&format!(
            "SELECT {VALIDATION_COLUMNS}, timestamp_processed_validation FROM {} \
             WHERE timestamp_validation_close < ? ORDER BY timestamp_validation_close",
            self.table
        ))
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ProcessedValidation {
                    validation: validation_from_row(row)?,
                    timestamp_processed_validation: row.get("timestamp_processed_validation"),
                })
            })
            .collect()
    }

    async fn count_closed_before(&self, watermark: DateTime<Utc>) -> DbResult<i64> {
        common::count_closed_before(&self.pool, self.table, watermark).await
    }

    async fn delete_closed_before(
        &self,
        watermark: DateTime<Utc>,
        batch_size: u32,
    ) -> DbResult<u64> {
        common::delete_closed_before(&self.pool, self.table, watermark, batch_size).await
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.pool, self.table).await
    }
}

#[async_trait]
impl ArchiveRepo<ProcessedValidation> for SqliteProcessedValidationStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn insert(&self, record: &ProcessedValidation) -> DbResult<()> {
        let validation = &record.validation;
        sqlx::query(&format!(
            "INSERT INTO {} ({VALIDATION_COLUMNS}, timestamp_processed_validation) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            self.table
        ))
        .bind(validation.vid.to_string())
        .bind(&validation.secret_validation_key)
        .bind(validation.timestamp_received_validation)
        .bind(validation.timestamp_validation_close)
        .bind(&validation.client_ip)
        .bind(&validation.petition_id)
        .bind(record.timestamp_processed_validation)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.pool, self.table).await
    }
}
