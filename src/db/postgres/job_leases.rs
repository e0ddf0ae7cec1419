use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::db::{
    error::{DbError, DbResult},
    repos::JobLeaseRepo,
};

pub struct PostgresJobLeaseRepo {
    write_pool: PgPool,
}

impl PostgresJobLeaseRepo {
    pub fn new(write_pool: PgPool) -> Self {
        Self { write_pool }
    }
}

#[async_trait]
impl JobLeaseRepo for PostgresJobLeaseRepo {
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
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (job_name) DO UPDATE SET
                holder = EXCLUDED.holder,
                acquired_at = EXCLUDED.acquired_at,
                expires_at = EXCLUDED.expires_at
            WHERE job_leases.expires_at <= EXCLUDED.acquired_at
            "#,
        )
        .bind(job_name)
        .bind(holder)
        .bind(now)
        .bind(expires_at)
        .execute(&self.write_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, job_name: &str, holder: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM job_leases WHERE job_name = $1 AND holder = $2")
            .bind(job_name)
            .bind(holder)
            .execute(&self.write_pool)
            .await?;

        Ok(())
    }
}
