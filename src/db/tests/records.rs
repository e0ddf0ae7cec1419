//! Shared tests for the signature and processed-record stores
//!
//! Records are written through the intake writers and read back through the
//! processing and archive handles the archive workflow uses.

use super::harness::{TestStores, day, processed_signature, processed_validation, signature};

// ============================================================================
// Watermark Predicate Tests
// ============================================================================

pub async fn test_list_closed_before_is_strict(stores: &TestStores) {
    let early = signature("key-early", day(2024, 1, 1));
    let at_watermark = signature("key-at", day(2024, 1, 5));
    let late = signature("key-late", day(2024, 1, 10));
    for sig in [&early, &at_watermark, &late] {
        stores
            .intake
            .pending_signatures
            .insert(sig)
            .await
            .expect("Failed to insert signature");
    }

    let listed = stores
        .processing
        .pending_signatures
        .list_closed_before(day(2024, 1, 5))
        .await
        .expect("Failed to list signatures");

    assert_eq!(listed, vec![early]);
}

pub async fn test_list_closed_before_empty(stores: &TestStores) {
    let listed = stores
        .processing
        .pending_signatures
        .list_closed_before(day(2024, 1, 5))
        .await
        .expect("Failed to list signatures");

    assert!(listed.is_empty());
}

pub async fn test_count_closed_before(stores: &TestStores) {
    for d in 1..=6 {
        stores
            .intake
            .pending_signatures
            .insert(&signature(&format!("key-{d}"), day(2024, 2, d)))
            .await
            .expect("Failed to insert signature");
    }

    let repo = &stores.processing.pending_signatures;
    assert_eq!(repo.count_closed_before(day(2024, 2, 4)).await.unwrap(), 3);
    assert_eq!(repo.count_closed_before(day(2024, 1, 1)).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 6);
}

pub async fn test_processed_signature_fields_survive_storage(stores: &TestStores) {
    let record = processed_signature("key-processed", day(2024, 3, 1));
    stores
        .intake
        .processed_signatures
        .insert(&record)
        .await
        .expect("Failed to insert processed signature");

    let listed = stores
        .processing
        .processed_signatures
        .list_closed_before(day(2024, 3, 2))
        .await
        .expect("Failed to list processed signatures");

    assert_eq!(listed, vec![record]);
}

pub async fn test_processed_validation_without_client_ip(stores: &TestStores) {
    let mut record = processed_validation("key-processed", day(2024, 3, 1));
    record.validation.client_ip = None;
    stores
        .intake
        .processed_validations
        .insert(&record)
        .await
        .expect("Failed to insert processed validation");

    let listed = stores
        .processing
        .processed_validations
        .list_closed_before(day(2024, 3, 2))
        .await
        .expect("Failed to list processed validations");

    assert_eq!(listed, vec![record]);
}

// ============================================================================
// Batched Delete Tests
// ============================================================================

pub async fn test_delete_closed_before_in_batches(stores: &TestStores) {
    for d in 1..=7 {
        stores
            .intake
            .processed_validations
            .insert(&processed_validation(&format!("old-{d}"), day(2024, 1, d)))
            .await
            .expect("Failed to insert processed validation");
    }
    for d in 20..=21 {
        stores
            .intake
            .processed_validations
            .insert(&processed_validation(&format!("new-{d}"), day(2024, 1, d)))
            .await
            .expect("Failed to insert processed validation");
    }

    let repo = &stores.processing.processed_validations;
    let deleted = repo
        .delete_closed_before(day(2024, 1, 15), 3)
        .await
        .expect("Failed to delete");

    assert_eq!(deleted, 7);
    assert_eq!(repo.count().await.unwrap(), 2);
    assert_eq!(repo.count_closed_before(day(2024, 1, 15)).await.unwrap(), 0);
}

pub async fn test_delete_closed_before_exact_batch_multiple(stores: &TestStores) {
    for d in 1..=4 {
        stores
            .intake
            .processed_signatures
            .insert(&processed_signature(&format!("key-{d}"), day(2024, 1, d)))
            .await
            .expect("Failed to insert processed signature");
    }

    let deleted = stores
        .processing
        .processed_signatures
        .delete_closed_before(day(2024, 2, 1), 2)
        .await
        .expect("Failed to delete");

    assert_eq!(deleted, 4);
    assert_eq!(stores.processing.processed_signatures.count().await.unwrap(), 0);
}

pub async fn test_delete_closed_before_nothing_to_delete(stores: &TestStores) {
    stores
        .intake
        .pending_signatures
        .insert(&signature("key-late", day(2024, 6, 1)))
        .await
        .expect("Failed to insert signature");

    let deleted = stores
        .processing
        .pending_signatures
        .delete_closed_before(day(2024, 1, 1), 100)
        .await
        .expect("Failed to delete");

    assert_eq!(deleted, 0);
    assert_eq!(stores.processing.pending_signatures.count().await.unwrap(), 1);
}

// ============================================================================
// Archive Store Tests
// ============================================================================

pub async fn test_archive_accepts_duplicate_records(stores: &TestStores) {
    let record = signature("key-dup", day(2024, 1, 1));
    let archive = &stores.archive.not_validated_signatures;

    archive.insert(&record).await.expect("First insert failed");
    archive.insert(&record).await.expect("Second insert failed");

    assert_eq!(archive.count().await.unwrap(), 2);
}

pub async fn test_archive_stores_are_separate_tables(stores: &TestStores) {
    stores
        .archive
        .processed_signatures
        .insert(&processed_signature("key-1", day(2024, 1, 1)))
        .await
        .expect("Failed to insert");

    assert_eq!(stores.archive.processed_signatures.count().await.unwrap(), 1);
    assert_eq!(stores.archive.not_validated_signatures.count().await.unwrap(), 0);
    assert_eq!(stores.archive.processed_validations.count().await.unwrap(), 0);
    assert_eq!(stores.archive.orphaned_validations.count().await.unwrap(), 0);
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

    sqlite_test!(test_list_closed_before_is_strict);
    sqlite_test!(test_list_closed_before_empty);
    sqlite_test!(test_count_closed_before);
    sqlite_test!(test_processed_signature_fields_survive_storage);
    sqlite_test!(test_processed_validation_without_client_ip);
    sqlite_test!(test_delete_closed_before_in_batches);
    sqlite_test!(test_delete_closed_before_exact_batch_multiple);
    sqlite_test!(test_delete_closed_before_nothing_to_delete);
    sqlite_test!(test_archive_accepts_duplicate_records);
    sqlite_test!(test_archive_stores_are_separate_tables);
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

    postgres_test!(test_list_closed_before_is_strict);
    postgres_test!(test_list_closed_before_empty);
    postgres_test!(test_count_closed_before);
    postgres_test!(test_processed_signature_fields_survive_storage);
    postgres_test!(test_processed_validation_without_client_ip);
    postgres_test!(test_delete_closed_before_in_batches);
    postgres_test!(test_delete_closed_before_exact_batch_multiple);
    postgres_test!(test_delete_closed_before_nothing_to_delete);
    postgres_test!(test_archive_accepts_duplicate_records);
    postgres_test!(test_archive_stores_are_separate_tables);
}
