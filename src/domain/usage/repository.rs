//! Usage record storage port
//!
//! Defined in the domain layer as a trait (port) and implemented by the
//! infrastructure adapters (in-memory, PostgreSQL).

use async_trait::async_trait;

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::SubscriptionId;
use crate::domain::usage::record::UsageRecord;

/// Transactional persistence and interval-aware querying of usage records.
///
/// Both batch operations are atomic per call: every record is applied or
/// none are, and a failure anywhere leaves storage exactly as it was.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageRecordStore: Send + Sync {
    /// Every record for `group_name` (and `subscription`, when given) whose
    /// interval overlaps `cycle`: a record matches when its end is absent or
    /// later than the cycle start, and its start is earlier than the cycle
    /// end. With no cycle, all matching records are returned regardless of
    /// time. Results are ordered by start ascending so reconciliation is
    /// reproducible.
    async fn fetch_cycle_records(
        &self,
        group_name: &str,
        subscription: Option<SubscriptionId>,
        cycle: Option<BillingCycle>,
    ) -> Result<Vec<UsageRecord>>;

    /// Upsert a batch. Records carrying an id are updated; records without
    /// one are inserted and returned with fresh ids, in input order. An
    /// update matching zero stored rows is a consistency error and aborts
    /// the whole batch.
    async fn set_records(&self, records: Vec<UsageRecord>) -> Result<Vec<UsageRecord>>;

    /// Delete the given records by id. Records without an id never existed
    /// in storage and are skipped silently.
    async fn delete_records(&self, records: &[UsageRecord]) -> Result<()>;
}
