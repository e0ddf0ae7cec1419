use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::db::{error::DbResult, repos::QueueStatusRepo};

pub struct PostgresQueueStatusRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresQueueStatusRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }
}

#[async_trait]
impl QueueStatusRepo for PostgresQueueStatusRepo {
    async fn last_emptied(&self) -> DbResult<HashMap<String, DateTime<Utc>>> {
        let rows = sqlx::query("SELECT queue_name, last_emptied_at FROM intake_queue_status")
            .fetch_all(&self.read_pool)
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
            VALUES ($1, $2)
            ON CONFLICT (queue_name) DO UPDATE SET last_emptied_at = EXCLUDED.last_emptied_at
            "#,
        )
        .bind(queue)
        .bind(at)
        .execute(&self.write_pool)
        .await?;

        Ok(())
    }
}
