//! Migration and pool tests

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use crate::{
        db::{
            ArchiveStores, DatabaseRole, ProcessingStores,
            tests::harness::{create_sqlite_pool, run_sqlite_migrations},
        },
        models::RecordCategory,
    };

    #[tokio::test]
    async fn test_both_roles_can_share_one_database() {
        let pool = create_sqlite_pool().await;
        let processing = run_sqlite_migrations(&pool, DatabaseRole::Processing).await;
        let archive = run_sqlite_migrations(&pool, DatabaseRole::Archive).await;

        // Re-running either set must ignore the other's applied versions.
        processing.run_migrations().await.expect("Processing re-run failed");
        archive.run_migrations().await.expect("Archive re-run failed");

        for category in RecordCategory::ALL {
            for table in [category.processing_table(), category.archive_table()] {
                let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                    .fetch_one(&pool)
                    .await
                    .unwrap_or_else(|e| panic!("Table {table} missing: {e}"));
                assert_eq!(count, 0);
            }
        }

        let stores = ProcessingStores::from_pool(&processing);
        assert_eq!(stores.validations.count().await.unwrap(), 0);
        let stores = ArchiveStores::from_pool(&archive);
        assert_eq!(stores.orphaned_validations.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_archive_migrations_do_not_create_processing_tables() {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool, DatabaseRole::Archive).await;

        let result = sqlx::query("SELECT COUNT(*) FROM pending_signatures")
            .fetch_one(&pool)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_health_check() {
        let pool = create_sqlite_pool().await;
        let db = run_sqlite_migrations(&pool, DatabaseRole::Processing).await;

        db.health_check().await.expect("Health check failed");
        assert_eq!(db.role(), DatabaseRole::Processing);
    }
}
