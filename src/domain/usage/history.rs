//! Cycle-clipped history retrieval, shared by all usage types.

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::SubscriptionId;
use crate::domain::usage::record::UsageRecord;
use crate::domain::usage::repository::UsageRecordStore;

/// Fetch the records overlapping `cycle` and clip each returned copy to the
/// cycle bounds, so downstream aggregation never special-cases cycle
/// boundaries or open-ended records. Every returned record has a defined
/// end. Clipping happens on the in-memory copies only; nothing is persisted.
///
/// This is a pure function of its inputs - no caching.
pub async fn usage_history(
    store: &dyn UsageRecordStore,
    group_name: &str,
    subscription: SubscriptionId,
    cycle: &BillingCycle,
) -> Result<Vec<UsageRecord>> {
    let mut records = store
        .fetch_cycle_records(group_name, Some(subscription), Some(*cycle))
        .await?;
    for record in &mut records {
        record.clip_to(cycle);
    }
    Ok(records)
}
