//! Gauge usage type
//!
//! Usage is a level that holds over an interval until explicitly changed,
//! so records for one group+subscription must tile time without overlap.
//! Registration moves every conflicting record out of the way - truncating,
//! splitting, or deleting it - so that even badly-behaved callers cannot
//! violate the timeline.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::error::UsageError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{Timestamp, VariationId};
use crate::domain::subscription::{Subscription, SubscriptionCapability};
use crate::domain::usage::charge::Charge;
use crate::domain::usage::group::UsageGroup;
use crate::domain::usage::history::usage_history;
use crate::domain::usage::locks::UsageLockRegistry;
use crate::domain::usage::record::UsageRecord;
use crate::domain::usage::repository::UsageRecordStore;
use crate::domain::usage::usage_type::{require_capabilities, validate_usage_input, UsageType};

pub struct GaugeUsage {
    store: Arc<dyn UsageRecordStore>,
    group: UsageGroup,
    subscription: Arc<dyn Subscription>,
    locks: Arc<UsageLockRegistry>,
}

impl GaugeUsage {
    pub const REQUIRED_CAPABILITIES: &'static [SubscriptionCapability] = &[
        SubscriptionCapability::FreeUsage,
        SubscriptionCapability::InitialUsage,
    ];

    pub fn new(
        store: Arc<dyn UsageRecordStore>,
        group: UsageGroup,
        subscription: Arc<dyn Subscription>,
        locks: Arc<UsageLockRegistry>,
    ) -> Result<Self> {
        require_capabilities(subscription.as_ref(), &group.name, Self::REQUIRED_CAPABILITIES)?;
        Ok(Self {
            store,
            group,
            subscription,
            locks,
        })
    }
}

#[async_trait]
impl UsageType for GaugeUsage {
    fn group_name(&self) -> &str {
        &self.group.name
    }

    fn required_capabilities(&self) -> &'static [SubscriptionCapability] {
        Self::REQUIRED_CAPABILITIES
    }

    /// Reconcile the new interval against the stored timeline.
    ///
    /// Every stored record overlapping `[start, end]` is adjusted: the part
    /// before `start` survives as a truncated head, the part after `end`
    /// survives as a truncated (or split-off) tail, and anything in between
    /// is superseded. An open-ended registration supersedes everything at or
    /// after its start. Disjoint records are left untouched.
    ///
    /// The whole read-reconcile-write sequence runs under the per-key lock;
    /// interleaved registrations for the same group+subscription cannot
    /// observe each other's intermediate state.
    async fn add_usage(&self, quantity: i64, start: Timestamp, end: Option<Timestamp>)
        -> Result<()> {
        validate_usage_input(quantity, start, end)?;

        let _guard = self
            .locks
            .acquire(&self.group.name, self.subscription.id())
            .await;

        // Raw records, not cycle-clipped: reconciliation must see true
        // boundaries.
        let records = self
            .store
            .fetch_cycle_records(&self.group.name, Some(self.subscription.id()), None)
            .await?;

        let mut new_record = UsageRecord::new(
            &self.group.name,
            self.subscription.id(),
            self.group.product_variation_id,
            quantity,
            start,
        );
        new_record.end = end;

        let mut writes = vec![new_record];
        let mut deletions = Vec::new();

        for mut record in records {
            // Entirely before the new interval.
            if record.end.map_or(false, |record_end| record_end < start) {
                continue;
            }
            // Entirely after it.
            if let Some(new_end) = end {
                if record.start > new_end {
                    continue;
                }
            }

            // The overlapping record's surviving tail past the new interval.
            let tail = match end {
                None => None,
                Some(new_end) => match record.end {
                    None => Some((new_end + 1, None)),
                    Some(record_end) if record_end > new_end => {
                        Some((new_end + 1, Some(record_end)))
                    }
                    Some(_) => None,
                },
            };

            if record.start < start {
                if let Some((tail_start, tail_end)) = tail {
                    // The record spans the whole new interval: split off the
                    // tail as a fresh record before truncating the head.
                    let mut tail_record = record.clone();
                    tail_record.id = None;
                    tail_record.start = tail_start;
                    tail_record.end = tail_end;
                    writes.push(tail_record);
                }
                record.end = Some(start - 1);
                writes.push(record);
            } else {
                match tail {
                    // Starts inside the new interval but extends past it.
                    Some((tail_start, tail_end)) => {
                        record.start = tail_start;
                        record.end = tail_end;
                        writes.push(record);
                    }
                    // Fully superseded.
                    None => deletions.push(record),
                }
            }
        }

        debug!(
            group = %self.group.name,
            subscription = %self.subscription.id(),
            quantity,
            start,
            writes = writes.len(),
            deletions = deletions.len(),
            "reconciling gauge usage"
        );
        self.store.set_records(writes).await?;
        self.store.delete_records(&deletions).await?;
        Ok(())
    }

    /// The current level: the quantity of whichever record starts latest,
    /// not a sum.
    async fn current_usage(&self, cycle: Option<&BillingCycle>) -> Result<i64> {
        let records = self
            .store
            .fetch_cycle_records(&self.group.name, Some(self.subscription.id()), cycle.copied())
            .await?;
        Ok(records
            .iter()
            .max_by_key(|record| record.start)
            .map(|record| record.quantity)
            .unwrap_or(0))
    }

    /// Gauge groups expect their records to span the whole billing cycle:
    /// the clipped record lengths must add up to the cycle length, second
    /// for second. A shortfall means the timeline has gaps and billing for
    /// this cycle must wait for more data.
    async fn is_complete(&self, cycle: &BillingCycle) -> Result<bool> {
        let records = usage_history(
            self.store.as_ref(),
            &self.group.name,
            self.subscription.id(),
            cycle,
        )
        .await?;
        let covered: i64 = records
            .iter()
            .filter_map(|record| record.length_secs())
            .sum();
        Ok(covered == cycle.length_secs())
    }

    /// Net per-variation quantities over the clipped history, with both the
    /// free and the initial allowance deducted, floored at zero.
    async fn charges(&self, cycle: &BillingCycle) -> Result<Vec<Charge>> {
        let records = usage_history(
            self.store.as_ref(),
            &self.group.name,
            self.subscription.id(),
            cycle,
        )
        .await?;

        let mut totals: BTreeMap<VariationId, i64> = BTreeMap::new();
        for record in &records {
            *totals.entry(record.product_variation_id).or_default() += record.quantity;
        }

        let subscription_type = self.subscription.subscription_type();
        let free = subscription_type.free_usage().ok_or_else(|| {
            UsageError::Configuration(format!(
                "subscription type '{}' lost its free-usage capability",
                subscription_type.id()
            ))
        })?;
        let initial = subscription_type.initial_usage().ok_or_else(|| {
            UsageError::Configuration(format!(
                "subscription type '{}' lost its initial-usage capability",
                subscription_type.id()
            ))
        })?;

        let mut charges = Vec::with_capacity(totals.len());
        for (variation, quantity) in totals {
            let allowance = free.free_quantity(&self.group.name, variation, cycle)
                + initial.initial_usage(&self.group.name, variation, Some(cycle));
            charges.push(Charge::new(variation, (quantity - allowance).max(0)));
        }
        Ok(charges)
    }

    /// Re-seed the gauge when the subscription's plan or state changes: the
    /// initial-usage quantity becomes the level from `effective_at` onward.
    async fn on_subscription_change(&self, effective_at: Timestamp) -> Result<()> {
        let quantity = {
            let subscription_type = self.subscription.subscription_type();
            let provider = subscription_type.initial_usage().ok_or_else(|| {
                UsageError::Configuration(format!(
                    "subscription type '{}' lost its initial-usage capability",
                    subscription_type.id()
                ))
            })?;
            provider.initial_usage(&self.group.name, self.group.product_variation_id, None)
        };
        self.add_usage(quantity, effective_at, None).await
    }
}
