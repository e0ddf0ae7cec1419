use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::error::{DbError, DbResult};

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

/// Count all rows of `table`.
pub async fn count_rows(pool: &SqlitePool, table: &str) -> DbResult<i64> {
    let row = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

/// Count rows of `table` whose validation closed before the watermark.
pub async fn count_closed_before(
    pool: &SqlitePool,
    table: &str,
    watermark: DateTime<Utc>,
) -> DbResult<i64> {
    let row = sqlx::query(&format!(
        "SELECT COUNT(*) AS count FROM {table} WHERE timestamp_validation_close < ?"
    ))
    .bind(watermark)
    .fetch_one(pool)
    .await?;
    Ok(row.get("count"))
}

/// Delete rows of `table` whose validation closed before the watermark,
/// `batch_size` rows per statement, until none are left.
pub async fn delete_closed_before(
    pool: &SqlitePool,
    table: &str,
    watermark: DateTime<Utc>,
    batch_size: u32,
) -> DbResult<u64> {
    let limit = i64::from(batch_size.max(1));
    let query = format!(
        r#"
        DELETE FROM {table}
        WHERE rowid IN (
            SELECT rowid FROM {table}
            WHERE timestamp_validation_close < ?
            LIMIT ?
        )
        "#
    );

    let mut total_deleted: u64 = 0;

    loop {
        let result = sqlx::query(&query)
            .bind(watermark)
            .bind(limit)
            .execute(pool)
            .await?;

        let rows_deleted = result.rows_affected();
        total_deleted += rows_deleted;

        if rows_deleted < limit as u64 {
            break;
        }
    }

    Ok(total_deleted)
}
