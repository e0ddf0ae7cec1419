use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::db::{
    error::{DbError, DbResult},
    repos::JobLeaseRepo,
};

pub struct SqliteJobLeaseRepo {
    pool: SqlitePool,
}

impl SqliteJobLeaseRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobLeaseRepo for SqliteJobLeaseRepo {
    async fn try_acquire(
        &self,
        job_name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DbResult<bool> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| DbError::Internal(format!("Lease expiry out of range: {now} + {ttl}")))?;

        // The upsert only takes over a lease whose expiry has passed.
        let result = sqlx::query(
            r#"
            INSERT INTO job_leases (job_name, holder, acquired_at, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (job_name) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at,
                expires_at = excluded.expires_at
            WHERE job_leases.expires_at <= excluded.acquired_at
            "#,
        )
        .bind(job_name)
        .bind(holder)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, job_name: &str, holder: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM job_leases WHERE job_name = ? AND holder = ?")
            .bind(job_name)
            .bind(holder)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
