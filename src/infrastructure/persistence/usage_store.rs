//! PostgreSQL implementation of the usage record store

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::error::UsageError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{RecordId, SubscriptionId, VariationId};
use crate::domain::usage::record::UsageRecord;
use crate::domain::usage::repository::UsageRecordStore;

#[derive(FromRow)]
struct UsageRow {
    id: i64,
    usage_group: String,
    subscription_id: Uuid,
    product_variation_id: Uuid,
    quantity: i64,
    start_time: i64,
    end_time: Option<i64>,
}

impl From<UsageRow> for UsageRecord {
    fn from(row: UsageRow) -> Self {
        UsageRecord {
            id: Some(RecordId::new(row.id)),
            group_name: row.usage_group,
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            product_variation_id: VariationId::from_uuid(row.product_variation_id),
            quantity: row.quantity,
            start: row.start_time,
            end: row.end_time,
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, usage_group, subscription_id, product_variation_id, quantity, start_time, end_time
     FROM usage_records";

pub struct PgUsageRecordStore {
    pool: PgPool,
}

impl PgUsageRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage_error(context: &str, source: sqlx::Error) -> UsageError {
    error!("{context}: {source}");
    UsageError::Storage(format!("{context}: {source}"))
}

#[async_trait]
impl UsageRecordStore for PgUsageRecordStore {
    async fn fetch_cycle_records(
        &self,
        group_name: &str,
        subscription: Option<SubscriptionId>,
        cycle: Option<BillingCycle>,
    ) -> Result<Vec<UsageRecord>> {
        debug!(group = group_name, "fetching usage records");

        // Open-ended records have no end; the cycle filter keeps any record
        // ending after the cycle starts (or never) and starting before the
        // cycle ends.
        let rows: Vec<UsageRow> = match (subscription, cycle) {
            (None, None) => {
                sqlx::query_as::<_, UsageRow>(&format!(
                    "{SELECT_COLUMNS} WHERE usage_group = $1 ORDER BY start_time, id"
                ))
                .bind(group_name)
                .fetch_all(&self.pool)
                .await
            }
            (Some(subscription), None) => {
                sqlx::query_as::<_, UsageRow>(&format!(
                    "{SELECT_COLUMNS} WHERE usage_group = $1 AND subscription_id = $2
                     ORDER BY start_time, id"
                ))
                .bind(group_name)
                .bind(subscription.as_uuid())
                .fetch_all(&self.pool)
                .await
            }
            (None, Some(cycle)) => {
                sqlx::query_as::<_, UsageRow>(&format!(
                    "{SELECT_COLUMNS} WHERE usage_group = $1
                     AND (end_time IS NULL OR end_time > $2) AND start_time < $3
                     ORDER BY start_time, id"
                ))
                .bind(group_name)
                .bind(cycle.start())
                .bind(cycle.end())
                .fetch_all(&self.pool)
                .await
            }
            (Some(subscription), Some(cycle)) => {
                sqlx::query_as::<_, UsageRow>(&format!(
                    "{SELECT_COLUMNS} WHERE usage_group = $1 AND subscription_id = $2
                     AND (end_time IS NULL OR end_time > $3) AND start_time < $4
                     ORDER BY start_time, id"
                ))
                .bind(group_name)
                .bind(subscription.as_uuid())
                .bind(cycle.start())
                .bind(cycle.end())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| storage_error("failed to fetch usage records", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_records(&self, records: Vec<UsageRecord>) -> Result<Vec<UsageRecord>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("failed to begin transaction", e))?;

        let mut stored = Vec::with_capacity(records.len());
        for mut record in records {
            match record.id {
                Some(id) => {
                    let result = sqlx::query(
                        "UPDATE usage_records
                         SET usage_group = $2, subscription_id = $3, product_variation_id = $4,
                             quantity = $5, start_time = $6, end_time = $7
                         WHERE id = $1",
                    )
                    .bind(id.as_i64())
                    .bind(&record.group_name)
                    .bind(record.subscription_id.as_uuid())
                    .bind(record.product_variation_id.as_uuid())
                    .bind(record.quantity)
                    .bind(record.start)
                    .bind(record.end)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| storage_error("failed to update usage record", e))?;

                    // The number of matched rows had better be exactly one;
                    // anything else means the in-memory record diverged from
                    // storage.
                    if result.rows_affected() != 1 {
                        tx.rollback()
                            .await
                            .map_err(|e| storage_error("failed to roll back", e))?;
                        return Err(UsageError::Consistency(format!(
                            "update of usage record {id} matched no stored row"
                        )));
                    }
                }
                None => {
                    let id: i64 = sqlx::query_scalar(
                        "INSERT INTO usage_records
                         (usage_group, subscription_id, product_variation_id, quantity, start_time, end_time)
                         VALUES ($1, $2, $3, $4, $5, $6)
                         RETURNING id",
                    )
                    .bind(&record.group_name)
                    .bind(record.subscription_id.as_uuid())
                    .bind(record.product_variation_id.as_uuid())
                    .bind(record.quantity)
                    .bind(record.start)
                    .bind(record.end)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| storage_error("failed to insert usage record", e))?;
                    record.id = Some(RecordId::new(id));
                }
            }
            stored.push(record);
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("failed to commit usage records", e))?;
        debug!(count = stored.len(), "stored usage record batch");
        Ok(stored)
    }

    async fn delete_records(&self, records: &[UsageRecord]) -> Result<()> {
        let ids: Vec<i64> = records
            .iter()
            .filter_map(|record| record.id)
            .map(|id| id.as_i64())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("failed to begin transaction", e))?;

        sqlx::query("DELETE FROM usage_records WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("failed to delete usage records", e))?;

        tx.commit()
            .await
            .map_err(|e| storage_error("failed to commit deletions", e))?;
        debug!(count = ids.len(), "deleted usage records");
        Ok(())
    }
}
