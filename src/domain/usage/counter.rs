//! Counter usage type
//!
//! Each usage event is a discrete point charge: registration writes one
//! record with `start == end` and accumulation is by summation. Counter
//! records never overlap-conflict, so there is no reconciliation step.

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
use crate::domain::usage::record::UsageRecord;
use crate::domain::usage::repository::UsageRecordStore;
use crate::domain::usage::usage_type::{require_capabilities, validate_usage_input, UsageType};

pub struct CounterUsage {
    store: Arc<dyn UsageRecordStore>,
    group: UsageGroup,
    subscription: Arc<dyn Subscription>,
}

impl CounterUsage {
    pub const REQUIRED_CAPABILITIES: &'static [SubscriptionCapability] =
        &[SubscriptionCapability::FreeUsage];

    pub fn new(
        store: Arc<dyn UsageRecordStore>,
        group: UsageGroup,
        subscription: Arc<dyn Subscription>,
    ) -> Result<Self> {
        require_capabilities(subscription.as_ref(), &group.name, Self::REQUIRED_CAPABILITIES)?;
        Ok(Self {
            store,
            group,
            subscription,
        })
    }
}

#[async_trait]
impl UsageType for CounterUsage {
    fn group_name(&self) -> &str {
        &self.group.name
    }

    fn required_capabilities(&self) -> &'static [SubscriptionCapability] {
        Self::REQUIRED_CAPABILITIES
    }

    /// Counter usage just needs to be registered at the given start; any end
    /// argument is ignored.
    async fn add_usage(
        &self,
        quantity: i64,
        start: Timestamp,
        _end: Option<Timestamp>,
    ) -> Result<()> {
        validate_usage_input(quantity, start, None)?;

        let record = UsageRecord::new(
            &self.group.name,
            self.subscription.id(),
            self.group.product_variation_id,
            quantity,
            start,
        )
        .with_end(start);

        debug!(
            group = %self.group.name,
            subscription = %self.subscription.id(),
            quantity,
            start,
            "registering counter usage"
        );
        self.store.set_records(vec![record]).await?;
        Ok(())
    }

    async fn current_usage(&self, cycle: Option<&BillingCycle>) -> Result<i64> {
        let records = match cycle {
            Some(cycle) => {
                usage_history(
                    self.store.as_ref(),
                    &self.group.name,
                    self.subscription.id(),
                    cycle,
                )
                .await?
            }
            None => {
                self.store
                    .fetch_cycle_records(&self.group.name, Some(self.subscription.id()), None)
                    .await?
            }
        };
        Ok(records.iter().map(|record| record.quantity).sum())
    }

    /// Sum the cycle's records per product variation, deduct the free
    /// allowance, and floor at zero.
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

        let provider = self
            .subscription
            .subscription_type()
            .free_usage()
            .ok_or_else(|| {
                UsageError::Configuration(format!(
                    "subscription type '{}' lost its free-usage capability",
                    self.subscription.subscription_type().id()
                ))
            })?;

        let mut charges = Vec::with_capacity(totals.len());
        for (variation, quantity) in totals {
            let free = provider.free_quantity(&self.group.name, variation, cycle);
            charges.push(Charge::new(variation, (quantity - free).max(0)));
        }
        Ok(charges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::usage::repository::MockUsageRecordStore;
    use crate::domain::subscription::{FreeUsageProvider, SubscriptionType};

    struct BareType;

    impl SubscriptionType for BareType {
        fn id(&self) -> &str {
            "bare"
        }

        fn capabilities(&self) -> &[SubscriptionCapability] {
            &[]
        }
    }

    struct FreeType;

    impl SubscriptionType for FreeType {
        fn id(&self) -> &str {
            "free"
        }

        fn capabilities(&self) -> &[SubscriptionCapability] {
            &[SubscriptionCapability::FreeUsage]
        }

        fn free_usage(&self) -> Option<&dyn FreeUsageProvider> {
            Some(self)
        }
    }

    impl FreeUsageProvider for FreeType {
        fn free_quantity(&self, _group: &str, _variation: VariationId, _cycle: &BillingCycle) -> i64 {
            0
        }
    }

    struct Sub<T: SubscriptionType>(crate::domain::shared::value_objects::SubscriptionId, T);

    impl<T: SubscriptionType> Subscription for Sub<T> {
        fn id(&self) -> crate::domain::shared::value_objects::SubscriptionId {
            self.0
        }

        fn subscription_type(&self) -> &dyn SubscriptionType {
            &self.1
        }
    }

    fn group() -> UsageGroup {
        UsageGroup::new(
            "api-calls",
            crate::domain::usage::group::UsageKind::Counter,
            VariationId::new(),
        )
    }

    #[test]
    fn test_construction_requires_free_usage_capability() {
        let store = Arc::new(MockUsageRecordStore::new());
        let subscription = Arc::new(Sub(
            crate::domain::shared::value_objects::SubscriptionId::new(),
            BareType,
        ));

        let result = CounterUsage::new(store, group(), subscription);
        assert!(matches!(result, Err(UsageError::Configuration(_))));
    }

    #[test]
    fn test_negative_quantity_rejected_before_storage() {
        tokio_test::block_on(async {
            // The mock has no expectations: any store call would panic.
            let store = Arc::new(MockUsageRecordStore::new());
            let subscription = Arc::new(Sub(
                crate::domain::shared::value_objects::SubscriptionId::new(),
                FreeType,
            ));
            let counter = CounterUsage::new(store, group(), subscription).unwrap();

            let result = counter.add_usage(-3, 100, None).await;
            assert!(matches!(result, Err(UsageError::InvalidInterval(_))));
        });
    }
}
