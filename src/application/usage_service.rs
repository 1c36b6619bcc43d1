//! Usage registration and charge computation for one subscription
//!
//! The service instantiates a usage type per group the subscription's type
//! declares, gating each on the type's capabilities at build time so a
//! misconfigured plan fails before any usage is registered.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::error::UsageError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{SubscriptionId, Timestamp};
use crate::domain::subscription::{Subscription, SubscriptionResolver};
use crate::domain::usage::charge::Charge;
use crate::domain::usage::counter::CounterUsage;
use crate::domain::usage::gauge::GaugeUsage;
use crate::domain::usage::group::UsageKind;
use crate::domain::usage::locks::UsageLockRegistry;
use crate::domain::usage::repository::UsageRecordStore;
use crate::domain::usage::usage_type::UsageType;

pub struct UsageService {
    subscription: Arc<dyn Subscription>,
    groups: BTreeMap<String, Arc<dyn UsageType>>,
}

impl UsageService {
    pub fn new(
        store: Arc<dyn UsageRecordStore>,
        locks: Arc<UsageLockRegistry>,
        subscription: Arc<dyn Subscription>,
    ) -> Result<Self> {
        let mut groups: BTreeMap<String, Arc<dyn UsageType>> = BTreeMap::new();
        for group in subscription.subscription_type().usage_groups() {
            let name = group.name.clone();
            let usage: Arc<dyn UsageType> = match group.kind {
                UsageKind::Counter => Arc::new(CounterUsage::new(
                    store.clone(),
                    group,
                    subscription.clone(),
                )?),
                UsageKind::Gauge => Arc::new(GaugeUsage::new(
                    store.clone(),
                    group,
                    subscription.clone(),
                    locks.clone(),
                )?),
            };
            groups.insert(name, usage);
        }
        debug!(
            subscription = %subscription.id(),
            groups = groups.len(),
            "built usage service"
        );
        Ok(Self {
            subscription,
            groups,
        })
    }

    /// Resolve the subscription by id, then build the service for it.
    pub async fn for_subscription(
        store: Arc<dyn UsageRecordStore>,
        locks: Arc<UsageLockRegistry>,
        resolver: &dyn SubscriptionResolver,
        id: SubscriptionId,
    ) -> Result<Self> {
        let subscription = resolver.resolve(id).await?;
        Self::new(store, locks, subscription)
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    fn group(&self, name: &str) -> Result<&Arc<dyn UsageType>> {
        self.groups
            .get(name)
            .ok_or_else(|| UsageError::Configuration(format!("unknown usage group '{name}'")))
    }

    pub async fn register_usage(
        &self,
        group_name: &str,
        quantity: i64,
        start: Timestamp,
        end: Option<Timestamp>,
    ) -> Result<()> {
        self.group(group_name)?.add_usage(quantity, start, end).await
    }

    pub async fn current_usage(
        &self,
        group_name: &str,
        cycle: Option<&BillingCycle>,
    ) -> Result<i64> {
        self.group(group_name)?.current_usage(cycle).await
    }

    pub async fn group_is_complete(&self, group_name: &str, cycle: &BillingCycle) -> Result<bool> {
        self.group(group_name)?.is_complete(cycle).await
    }

    /// A cycle is billable only when every group's records are complete.
    pub async fn is_complete(&self, cycle: &BillingCycle) -> Result<bool> {
        for usage in self.groups.values() {
            if !usage.is_complete(cycle).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn charges(&self, group_name: &str, cycle: &BillingCycle) -> Result<Vec<Charge>> {
        self.group(group_name)?.charges(cycle).await
    }

    /// Charges across every group, concatenated in group-name order.
    pub async fn all_charges(&self, cycle: &BillingCycle) -> Result<Vec<Charge>> {
        let mut all = Vec::new();
        for usage in self.groups.values() {
            all.extend(usage.charges(cycle).await?);
        }
        Ok(all)
    }

    /// Fan the change notification out to every usage group.
    pub async fn on_subscription_change(&self, effective_at: Timestamp) -> Result<()> {
        for usage in self.groups.values() {
            usage.on_subscription_change(effective_at).await?;
        }
        Ok(())
    }
}
