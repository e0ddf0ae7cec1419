//! Shared tests for JobLeaseRepo and QueueStatusRepo implementations

use chrono::Duration;

use super::harness::{TestStores, day};

const JOB: &str = "archive";

// ============================================================================
// Job Lease Tests
// ============================================================================

pub async fn test_acquire_free_lease(stores: &TestStores) {
    let acquired = stores
        .processing
        .job_leases
        .try_acquire(JOB, "worker-a", day(2024, 1, 1), Duration::hours(1))
        .await
        .expect("Failed to acquire");

    assert!(acquired);
}

pub async fn test_acquire_live_lease_fails(stores: &TestStores) {
    let leases = &stores.processing.job_leases;
    let now = day(2024, 1, 1);
    assert!(leases.try_acquire(JOB, "worker-a", now, Duration::hours(1)).await.unwrap());

    let acquired = leases
        .try_acquire(JOB, "worker-b", now + Duration::minutes(30), Duration::hours(1))
        .await
        .expect("Failed to attempt acquire");

    assert!(!acquired);
}

pub async fn test_acquire_expired_lease_succeeds(stores: &TestStores) {
    let leases = &stores.processing.job_leases;
    let now = day(2024, 1, 1);
    assert!(leases.try_acquire(JOB, "worker-a", now, Duration::hours(1)).await.unwrap());

    let acquired = leases
        .try_acquire(JOB, "worker-b", now + Duration::hours(2), Duration::hours(1))
        .await
        .expect("Failed to attempt acquire");

    assert!(acquired);
}

pub async fn test_leases_are_per_job(stores: &TestStores) {
    let leases = &stores.processing.job_leases;
    let now = day(2024, 1, 1);
    assert!(leases.try_acquire(JOB, "worker-a", now, Duration::hours(1)).await.unwrap());
    assert!(leases.try_acquire("other-job", "worker-b", now, Duration::hours(1)).await.unwrap());
}

pub async fn test_release_allows_reacquire(stores: &TestStores) {
    let leases = &stores.processing.job_leases;
    let now = day(2024, 1, 1);
    assert!(leases.try_acquire(JOB, "worker-a", now, Duration::hours(1)).await.unwrap());

    leases.release(JOB, "worker-a").await.expect("Failed to release");

    assert!(leases.try_acquire(JOB, "worker-b", now, Duration::hours(1)).await.unwrap());
}

pub async fn test_release_by_other_holder_is_ignored(stores: &TestStores) {
    let leases = &stores.processing.job_leases;
    let now = day(2024, 1, 1);
    assert!(leases.try_acquire(JOB, "worker-a", now, Duration::hours(1)).await.unwrap());

    leases.release(JOB, "worker-b").await.expect("Failed to release");

    assert!(!leases.try_acquire(JOB, "worker-b", now, Duration::hours(1)).await.unwrap());
}

// ============================================================================
// Queue Status Tests
// ============================================================================

pub async fn test_acquire_with_overflowing_ttl_fails(stores: &TestStores) {
    let leases = &stores.processing.job_leases;
    let result = leases
        .try_acquire(JOB, "worker-a", day(2024, 1, 1), Duration::MAX)
        .await;

    assert!(result.is_err());
    // Nothing was written; a sane lease can still be taken.
    let acquired = leases
        .try_acquire(JOB, "worker-b", day(2024, 1, 1), Duration::hours(1))
        .await
        .unwrap();
    assert!(acquired);
}

pub async fn test_last_emptied_empty(stores: &TestStores) {
    let status = stores
        .processing
        .queue_status
        .last_emptied()
        .await
        .expect("Failed to read queue status");

    assert!(status.is_empty());
}

pub async fn test_mark_emptied_overwrites(stores: &TestStores) {
    let queue_status = &stores.processing.queue_status;
    queue_status.mark_emptied("signatures", day(2024, 1, 1)).await.unwrap();
    queue_status.mark_emptied("validations", day(2024, 1, 2)).await.unwrap();
    queue_status.mark_emptied("signatures", day(2024, 1, 3)).await.unwrap();

    let status = queue_status.last_emptied().await.expect("Failed to read queue status");

    assert_eq!(status.len(), 2);
    assert_eq!(status["signatures"], day(2024, 1, 3));
    assert_eq!(status["validations"], day(2024, 1, 2));
}

// ============================================================================
// SQLite Tests
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use crate::db::tests::harness::sqlite_stores;

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let stores = sqlite_stores().await;
                super::$name(&stores).await;
            }
        };
    }

    sqlite_test!(test_acquire_free_lease);
    sqlite_test!(test_acquire_live_lease_fails);
    sqlite_test!(test_acquire_expired_lease_succeeds);
    sqlite_test!(test_leases_are_per_job);
    sqlite_test!(test_release_allows_reacquire);
    sqlite_test!(test_release_by_other_holder_is_ignored);
    sqlite_test!(test_acquire_with_overflowing_ttl_fails);
    sqlite_test!(test_last_emptied_empty);
    sqlite_test!(test_mark_emptied_overwrites);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use crate::db::tests::harness::postgres::postgres_stores;

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let stores = postgres_stores().await;
                super::$name(&stores).await;
            }
        };
    }

    postgres_test!(test_acquire_free_lease);
    postgres_test!(test_acquire_live_lease_fails);
    postgres_test!(test_acquire_expired_lease_succeeds);
    postgres_test!(test_leases_are_per_job);
    postgres_test!(test_release_allows_reacquire);
    postgres_test!(test_release_by_other_holder_is_ignored);
    postgres_test!(test_acquire_with_overflowing_ttl_fails);
    postgres_test!(test_last_emptied_empty);
    postgres_test!(test_mark_emptied_overwrites);
}
