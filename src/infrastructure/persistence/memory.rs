//! In-memory implementation of the usage record store
//!
//! Backs the reconciliation test suites and single-process deployments. A
//! whole `set_records` batch is validated before any row is applied, so the
//! atomicity observable to callers matches the transactional SQL adapter:
//! a failing batch leaves the table untouched.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::error::UsageError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{RecordId, SubscriptionId};
use crate::domain::usage::record::UsageRecord;
use crate::domain::usage::repository::UsageRecordStore;

#[derive(Default)]
struct Table {
    rows: BTreeMap<RecordId, UsageRecord>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryUsageRecordStore {
    table: Mutex<Table>,
}

impl MemoryUsageRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, across all groups and subscriptions.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageRecordStore for MemoryUsageRecordStore {
    async fn fetch_cycle_records(
        &self,
        group_name: &str,
        subscription: Option<SubscriptionId>,
        cycle: Option<BillingCycle>,
    ) -> Result<Vec<UsageRecord>> {
        let table = self.table.lock().unwrap();
        let mut records: Vec<UsageRecord> = table
            .rows
            .values()
            .filter(|record| record.group_name == group_name)
            .filter(|record| subscription.map_or(true, |sub| record.subscription_id == sub))
            .filter(|record| {
                cycle.map_or(true, |cycle| {
                    record.end.map_or(true, |end| end > cycle.start())
                        && record.start < cycle.end()
                })
            })
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.start, record.id));
        Ok(records)
    }

    async fn set_records(&self, records: Vec<UsageRecord>) -> Result<Vec<UsageRecord>> {
        let mut table = self.table.lock().unwrap();

        // Validate the whole batch before touching the table.
        for record in &records {
            if let Some(id) = record.id {
                if !table.rows.contains_key(&id) {
                    return Err(UsageError::Consistency(format!(
                        "update of usage record {id} matched no stored row"
                    )));
                }
            }
        }

        let mut stored = Vec::with_capacity(records.len());
        for mut record in records {
            let id = match record.id {
                Some(id) => id,
                None => {
                    table.next_id += 1;
                    let id = RecordId::new(table.next_id);
                    record.id = Some(id);
                    id
                }
            };
            table.rows.insert(id, record.clone());
            stored.push(record);
        }
        debug!(count = stored.len(), "stored usage record batch");
        Ok(stored)
    }

    async fn delete_records(&self, records: &[UsageRecord]) -> Result<()> {
        let mut table = self.table.lock().unwrap();
        for record in records {
            if let Some(id) = record.id {
                table.rows.remove(&id);
            }
        }
        Ok(())
    }
}
