//! PostgreSQL usage store integration tests
//!
//! These run against a real database and mirror the semantics the in-memory
//! suites verify: overlap-aware fetching, transactional batches, and the
//! consistency check on updates.

#![cfg(feature = "postgres")]

use anyhow::Result;
use sqlx::PgPool;

use meterbook::domain::billing_cycle::BillingCycle;
use meterbook::domain::shared::value_objects::{RecordId, SubscriptionId, VariationId};
use meterbook::domain::usage::{UsageRecord, UsageRecordStore};
use meterbook::infrastructure::persistence::{
    create_pool, run_migrations, DatabaseConfig, PgUsageRecordStore,
};
use meterbook::UsageError;

fn record(group: &str, subscription: SubscriptionId, start: i64, end: Option<i64>) -> UsageRecord {
    let mut r = UsageRecord::new(group, subscription, VariationId::new(), 1, start);
    r.end = end;
    r
}

#[tokio::test]
#[ignore] // Requires database
async fn test_insert_assigns_ids_and_fetch_orders_by_start() -> Result<()> {
    let pool = setup_database().await?;
    let store = PgUsageRecordStore::new(pool.clone());
    let subscription = SubscriptionId::new();

    let stored = store
        .set_records(vec![
            record("test-roundtrip", subscription, 100, Some(199)),
            record("test-roundtrip", subscription, 0, Some(99)),
        ])
        .await?;
    assert!(stored.iter().all(|r| r.is_persisted()));

    let fetched = store
        .fetch_cycle_records("test-roundtrip", Some(subscription), None)
        .await?;
    let starts: Vec<i64> = fetched.iter().map(|r| r.start).collect();
    assert_eq!(starts, vec![0, 100]);

    cleanup_database(pool).await;
    Ok(())
}

#[tokio::test]
#[ignore] // Requires database
async fn test_cycle_filter_is_open_end_aware() -> Result<()> {
    let pool = setup_database().await?;
    let store = PgUsageRecordStore::new(pool.clone());
    let subscription = SubscriptionId::new();

    store
        .set_records(vec![
            record("test-window", subscription, 0, Some(100)), // ends at cycle start
            record("test-window", subscription, 50, None),     // open-ended
            record("test-window", subscription, 150, Some(160)),
            record("test-window", subscription, 200, Some(300)), // starts at cycle end
        ])
        .await?;

    let cycle = BillingCycle::new(100, 200)?;
    let fetched = store
        .fetch_cycle_records("test-window", Some(subscription), Some(cycle))
        .await?;
    let starts: Vec<i64> = fetched.iter().map(|r| r.start).collect();
    assert_eq!(starts, vec![50, 150]);

    cleanup_database(pool).await;
    Ok(())
}

#[tokio::test]
#[ignore] // Requires database
async fn test_update_roundtrip() -> Result<()> {
    let pool = setup_database().await?;
    let store = PgUsageRecordStore::new(pool.clone());
    let subscription = SubscriptionId::new();

    let stored = store
        .set_records(vec![record("test-update", subscription, 0, None)])
        .await?;

    let mut update = stored[0].clone();
    update.end = Some(499);
    update.quantity = 9;
    store.set_records(vec![update]).await?;

    let fetched = store
        .fetch_cycle_records("test-update", Some(subscription), None)
        .await?;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].end, Some(499));
    assert_eq!(fetched[0].quantity, 9);

    cleanup_database(pool).await;
    Ok(())
}

#[tokio::test]
#[ignore] // Requires database
async fn test_phantom_update_rolls_back_the_whole_batch() -> Result<()> {
    let pool = setup_database().await?;
    let store = PgUsageRecordStore::new(pool.clone());
    let subscription = SubscriptionId::new();

    let stored = store
        .set_records(vec![record("test-atomic", subscription, 0, Some(99))])
        .await?;

    let mut valid_update = stored[0].clone();
    valid_update.quantity = 50;
    let mut phantom = record("test-atomic", subscription, 200, Some(299));
    phantom.id = Some(RecordId::new(i64::MAX));

    let result = store
        .set_records(vec![
            valid_update,
            record("test-atomic", subscription, 100, Some(199)),
            phantom,
        ])
        .await;
    assert!(matches!(result, Err(UsageError::Consistency(_))));

    // Neither the valid update nor the insert survived the rollback.
    let fetched = store
        .fetch_cycle_records("test-atomic", Some(subscription), None)
        .await?;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].quantity, 1);

    cleanup_database(pool).await;
    Ok(())
}

#[tokio::test]
#[ignore] // Requires database
async fn test_delete_skips_unpersisted_records() -> Result<()> {
    let pool = setup_database().await?;
    let store = PgUsageRecordStore::new(pool.clone());
    let subscription = SubscriptionId::new();

    let stored = store
        .set_records(vec![record("test-delete", subscription, 0, Some(99))])
        .await?;

    store
        .delete_records(&[
            record("test-delete", subscription, 500, None),
            stored[0].clone(),
        ])
        .await?;

    let fetched = store
        .fetch_cycle_records("test-delete", Some(subscription), None)
        .await?;
    assert!(fetched.is_empty());

    cleanup_database(pool).await;
    Ok(())
}

// Helper functions

async fn setup_database() -> Result<PgPool> {
    let url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/meterbook_test".to_string());

    let config = DatabaseConfig {
        url,
        max_connections: 5,
        acquire_timeout: std::time::Duration::from_secs(10),
    };

    let pool = create_pool(&config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn cleanup_database(pool: PgPool) {
    sqlx::query("DELETE FROM usage_records WHERE usage_group LIKE 'test-%'")
        .execute(&pool)
        .await
        .ok();
    pool.close().await;
}
