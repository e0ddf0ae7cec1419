//! Shared tests for ValidationRepo implementations

use std::collections::BTreeSet;

use super::harness::{TestStores, day, signature, validation};

async fn seed_validation(stores: &TestStores, key: &str, close_day: u32) {
    stores
        .intake
        .validations
        .insert(&validation(key, day(2024, 1, close_day)))
        .await
        .expect("Failed to insert validation");
}

async fn seed_pending(stores: &TestStores, key: &str, close_day: u32) {
    stores
        .intake
        .pending_signatures
        .insert(&signature(key, day(2024, 1, close_day)))
        .await
        .expect("Failed to insert signature");
}

fn keys(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|k| k.to_string()).collect()
}

// ============================================================================
// Orphan Detection Tests
// ============================================================================

pub async fn test_orphans_exclude_validations_with_pending_signature(stores: &TestStores) {
    seed_pending(stores, "matched", 2).await;
    seed_validation(stores, "matched", 2).await;
    seed_validation(stores, "orphan", 2).await;

    let orphans = stores
        .processing
        .validations
        .list_orphaned_before(day(2024, 1, 10))
        .await
        .expect("Failed to list orphans");

    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].secret_validation_key, "orphan");
}

pub async fn test_orphans_match_pending_signature_of_any_age(stores: &TestStores) {
    // A pending signature still inside its window protects its validation.
    seed_pending(stores, "matched", 28).await;
    seed_validation(stores, "matched", 2).await;

    let count = stores
        .processing
        .validations
        .count_orphaned_before(day(2024, 1, 10))
        .await
        .expect("Failed to count orphans");

    assert_eq!(count, 0);
}

pub async fn test_orphans_respect_watermark(stores: &TestStores) {
    seed_validation(stores, "old", 1).await;
    seed_validation(stores, "at-watermark", 10).await;
    seed_validation(stores, "new", 20).await;

    let repo = &stores.processing.validations;
    let orphans = repo
        .list_orphaned_before(day(2024, 1, 10))
        .await
        .expect("Failed to list orphans");

    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].secret_validation_key, "old");
    assert_eq!(repo.count_orphaned_before(day(2024, 1, 10)).await.unwrap(), 1);
}

pub async fn test_orphans_none(stores: &TestStores) {
    let repo = &stores.processing.validations;
    assert!(
        repo.list_orphaned_before(day(2024, 1, 10))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(repo.count_orphaned_before(day(2024, 1, 10)).await.unwrap(), 0);
}

// ============================================================================
// Delete By Key Tests
// ============================================================================

pub async fn test_delete_by_secret_keys_in_chunks(stores: &TestStores) {
    for key in ["a", "b", "c", "d", "e", "keep"] {
        seed_validation(stores, key, 1).await;
    }

    let repo = &stores.processing.validations;
    let deleted = repo
        .delete_by_secret_keys(&keys(&["a", "b", "c", "d", "e"]), day(2024, 1, 10), 2)
        .await
        .expect("Failed to delete");

    assert_eq!(deleted, 5);
    assert_eq!(repo.count().await.unwrap(), 1);
}

pub async fn test_delete_by_secret_keys_removes_every_row_with_key(stores: &TestStores) {
    seed_validation(stores, "shared", 1).await;
    seed_validation(stores, "shared", 2).await;
    seed_validation(stores, "other", 1).await;

    let repo = &stores.processing.validations;
    let deleted = repo
        .delete_by_secret_keys(&keys(&["shared"]), day(2024, 1, 10), 100)
        .await
        .expect("Failed to delete");

    assert_eq!(deleted, 2);
    assert_eq!(repo.count().await.unwrap(), 1);
}

pub async fn test_delete_by_secret_keys_empty_set(stores: &TestStores) {
    seed_validation(stores, "a", 1).await;

    let repo = &stores.processing.validations;
    let deleted = repo
        .delete_by_secret_keys(&BTreeSet::new(), day(2024, 1, 10), 100)
        .await
        .expect("Failed to delete");

    assert_eq!(deleted, 0);
    assert_eq!(repo.count().await.unwrap(), 1);
}

pub async fn test_delete_by_secret_keys_unknown_key(stores: &TestStores) {
    seed_validation(stores, "a", 1).await;

    let deleted = stores
        .processing
        .validations
        .delete_by_secret_keys(&keys(&["missing"]), day(2024, 1, 10), 100)
        .await
        .expect("Failed to delete");

    assert_eq!(deleted, 0);
}

pub async fn test_delete_by_secret_keys_keeps_rows_after_watermark(stores: &TestStores) {
    seed_validation(stores, "shared", 5).await;
    seed_validation(stores, "shared", 10).await;
    seed_validation(stores, "shared", 20).await;

    let repo = &stores.processing.validations;
    let deleted = repo
        .delete_by_secret_keys(&keys(&["shared"]), day(2024, 1, 10), 100)
        .await
        .expect("Failed to delete");

    assert_eq!(deleted, 1);
    assert_eq!(repo.count().await.unwrap(), 2);
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

    sqlite_test!(test_orphans_exclude_validations_with_pending_signature);
    sqlite_test!(test_orphans_match_pending_signature_of_any_age);
    sqlite_test!(test_orphans_respect_watermark);
    sqlite_test!(test_orphans_none);
    sqlite_test!(test_delete_by_secret_keys_in_chunks);
    sqlite_test!(test_delete_by_secret_keys_removes_every_row_with_key);
    sqlite_test!(test_delete_by_secret_keys_empty_set);
    sqlite_test!(test_delete_by_secret_keys_unknown_key);
    sqlite_test!(test_delete_by_secret_keys_keeps_rows_after_watermark);
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

    postgres_test!(test_orphans_exclude_validations_with_pending_signature);
    postgres_test!(test_orphans_match_pending_signature_of_any_age);
    postgres_test!(test_orphans_respect_watermark);
    postgres_test!(test_orphans_none);
    postgres_test!(test_delete_by_secret_keys_in_chunks);
    postgres_test!(test_delete_by_secret_keys_removes_every_row_with_key);
    postgres_test!(test_delete_by_secret_keys_empty_set);
    postgres_test!(test_delete_by_secret_keys_unknown_key);
    postgres_test!(test_delete_by_secret_keys_keeps_rows_after_watermark);
}
