use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use super::common::{self, parse_uuid};
use crate::{
    db::{
        error::DbResult,
        repos::{ArchiveRepo, ProcessingRepo},
    },
    models::{PersonalData, ProcessedSignature, Signature},
};

const SIGNATURE_COLUMNS: &str = "sid, secret_validation_key, source_api_key, petition_id, \
     timestamp_petition_close, timestamp_validation_close, \
     first_name, last_name, birth_date, street_address, zip_code, city, \
     timestamp_initiated_validation, timestamp_received_signature";

fn signature_from_row(row: &SqliteRow) -> DbResult<Signature> {
    Ok(Signature {
        sid: parse_uuid(&row.get::<String, _>("sid"))?,
        secret_validation_key: row.get("secret_validation_key"),
        source_api_key: row.get("source_api_key"),
        petition_id: row.get("petition_id"),
        timestamp_petition_close: row.get("timestamp_petition_close"),
        timestamp_validation_close: row.get("timestamp_validation_close"),
        personal: PersonalData {
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            birth_date: row.get("birth_date"),
            street_address: row.get("street_address"),
            zip_code: row.get("zip_code"),
            city: row.get("city"),
        },
        timestamp_initiated_validation: row.get("timestamp_initiated_validation"),
        timestamp_received_signature: row.get("timestamp_received_signature"),
    })
}

/// Signature rows: `pending_signatures` or `not_validated_signatures`.
pub struct SqliteSignatureStore {
    pool: SqlitePool,
    table: &'static str,
}

impl SqliteSignatureStore {
    pub fn new(pool: SqlitePool, table: &'static str) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl ProcessingRepo<Signature> for SqliteSignatureStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn list_closed_before(&self, watermark: DateTime<Utc>) -> DbResult<Vec<Signature>> {
        let rows = sqlx::query(&format!(
            "SELECT {SIGNATURE_COLUMNS} FROM {} WHERE timestamp_validation_close < ? \
             ORDER BY timestamp_validation_close",
            self.table
        ))
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(signature_from_row).collect()
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
impl ArchiveRepo<Signature> for SqliteSignatureStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn insert(&self, record: &Signature) -> DbResult<()> {
        sqlx::query(&format!(
            "INSERT INTO {} ({SIGNATURE_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table
        ))
        .bind(record.sid.to_string())
        .bind(&record.secret_validation_key)
        .bind(&record.source_api_key)
        .bind(&record.petition_id)
        .bind(record.timestamp_petition_close)
        .bind(record.timestamp_validation_close)
        .bind(&record.personal.first_name)
        .bind(&record.personal.last_name)
        .bind(record.personal.birth_date)
        .bind(&record.personal.street_address)
        .bind(&record.personal.zip_code)
        .bind(&record.personal.city)
        .bind(record.timestamp_initiated_validation)
        .bind(record.timestamp_received_signature)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.pool, self.table).await
    }
}

/// Processed signature rows: `processed_signatures` or `archived_processed_signatures`.
pub struct SqliteProcessedSignatureStore {
    pool: SqlitePool,
    table: &'static str,
}

impl SqliteProcessedSignatureStore {
    pub fn new(pool: SqlitePool, table: &'static str) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl ProcessingRepo<ProcessedSignature> for SqliteProcessedSignatureStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn list_closed_before(
        &self,
        watermark: DateTime<Utc>,
    ) -> DbResult<Vec<ProcessedSignature>> {
        let rows = sqlx::query(&format!(
            "SELECT {SIGNATURE_COLUMNS}, timestamp_processed_signature FROM {} \
             WHERE timestamp_validation_close < ? ORDER BY timestamp_validation_close",
            self.table
        ))
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ProcessedSignature {
                    signature: signature_from_row(row)?,
                    timestamp_processed_signature: row.get("timestamp_processed_signature"),
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
impl ArchiveRepo<ProcessedSignature> for SqliteProcessedSignatureStore {
    fn table(&self) -> &'static str {
        self.table
    }

    async fn insert(&self, record: &ProcessedSignature) -> DbResult<()> {
        let signature = &record.signature;
        sqlx::query(&format!(
            "INSERT INTO {} ({SIGNATURE_COLUMNS}, timestamp_processed_signature) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table
        ))
        .bind(signature.sid.to_string())
        .bind(&signature.secret_validation_key)
        .bind(&signature.source_api_key)
        .bind(&signature.petition_id)
        .bind(signature.timestamp_petition_close)
        .bind(signature.timestamp_validation_close)
        .bind(&signature.personal.first_name)
        .bind(&signature.personal.last_name)
        .bind(signature.personal.birth_date)
        .bind(&signature.personal.street_address)
        .bind(&signature.personal.zip_code)
        .bind(&signature.personal.city)
        .bind(signature.timestamp_initiated_validation)
        .bind(signature.timestamp_received_signature)
        .bind(record.timestamp_processed_signature)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> DbResult<i64> {
        common::count_rows(&self.pool, self.table).await
    }
}
