use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::db::error::DbResult;

/// Count all rows of `table`.
pub async fn count_rows(pool: &PgPool, table: &str) -> DbResult<i64> {
    let row = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

/// Count rows of `table` whose validation closed before the watermark.
pub async fn count_closed_before(
    pool: &PgPool,
    table: &str,
    watermark: DateTime<Utc>,
) -> DbResult<i64> {
    let row = sqlx::query(&format!(
        "SELECT COUNT(*) AS count FROM {table} WHERE timestamp_validation_close < $1"
    ))
    .bind(watermark)
    .fetch_one(pool)
    .await?;
    Ok(row.get("count"))
}

/// Delete rows of `table` whose validation closed before the watermark,
/// `batch_size` rows per statement, until none are left.
pub async fn delete_closed_before(
    pool: &PgPool,
    table: &str,
    watermark: DateTime<Utc>,
    batch_size: u32,
) -> DbResult<u64> {
    let limit = i64::from(batch_size.max(1));
    // PostgreSQL efficient batched deletion using ctid
    let query = format!(
        r#"
        DELETE FROM {table}
        WHERE ctid IN (
            SELECT ctid FROM {table}
            WHERE timestamp_validation_close < $1
            LIMIT $2
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
