use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::db::{error::DbResult, repos::QueueStatusRepo};

pub struct SqliteQueueStatusRepo {
    pool: SqlitePool,
}

impl SqliteQueueStatusRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStatusRepo for SqliteQueueStatusRepo {
    async fn last_emptied(&self) -> DbResult<HashMap<String, DateTime<Utc>>> {
        let rows = sqlx::query("SELECT queue_name, last_emptied_at FROM intake_queue_status")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("queue_name"), row.get("last_emptied_at")))
            .collect())
    }

    async fn mark_emptied(&self, queue: &str, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO intake_queue_status (queue_name, last_emptied_at)
            VALUES (?, ?)
            ON CONFLICT (queue_name) DO UPDATE SET last_emptied_at = excluded.last_emptied_at
            "#,
        )
        .bind(queue)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
