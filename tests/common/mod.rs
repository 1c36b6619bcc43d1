//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use meterbook::domain::billing_cycle::BillingCycle;
use meterbook::domain::shared::value_objects::{SubscriptionId, VariationId};
use meterbook::domain::subscription::{
    FreeUsageProvider, InitialUsageProvider, Subscription, SubscriptionCapability,
    SubscriptionType,
};
use meterbook::domain::usage::{UsageGroup, UsageRecord};

/// A configurable subscription plan for tests: capabilities, declared usage
/// groups, per-variation free allowances, and a flat initial quantity.
pub struct MeteredPlan {
    pub capabilities: Vec<SubscriptionCapability>,
    pub groups: Vec<UsageGroup>,
    pub free_by_variation: HashMap<VariationId, i64>,
    pub initial: i64,
}

impl MeteredPlan {
    /// A plan implementing both capabilities and declaring `groups`.
    pub fn full(groups: Vec<UsageGroup>) -> Self {
        Self {
            capabilities: vec![
                SubscriptionCapability::FreeUsage,
                SubscriptionCapability::InitialUsage,
            ],
            groups,
            free_by_variation: HashMap::new(),
            initial: 0,
        }
    }

    /// A plan with no capabilities at all.
    pub fn bare(groups: Vec<UsageGroup>) -> Self {
        Self {
            capabilities: Vec::new(),
            groups,
            free_by_variation: HashMap::new(),
            initial: 0,
        }
    }

    pub fn with_free(mut self, variation: VariationId, free: i64) -> Self {
        self.free_by_variation.insert(variation, free);
        self
    }

    pub fn with_initial(mut self, initial: i64) -> Self {
        self.initial = initial;
        self
    }
}

impl SubscriptionType for MeteredPlan {
    fn id(&self) -> &str {
        "metered-plan"
    }

    fn capabilities(&self) -> &[SubscriptionCapability] {
        &self.capabilities
    }

    fn usage_groups(&self) -> Vec<UsageGroup> {
        self.groups.clone()
    }

    fn free_usage(&self) -> Option<&dyn FreeUsageProvider> {
        self.capabilities
            .contains(&SubscriptionCapability::FreeUsage)
            .then_some(self as &dyn FreeUsageProvider)
    }

    fn initial_usage(&self) -> Option<&dyn InitialUsageProvider> {
        self.capabilities
            .contains(&SubscriptionCapability::InitialUsage)
            .then_some(self as &dyn InitialUsageProvider)
    }
}

impl FreeUsageProvider for MeteredPlan {
    fn free_quantity(&self, _group: &str, variation: VariationId, _cycle: &BillingCycle) -> i64 {
        self.free_by_variation.get(&variation).copied().unwrap_or(0)
    }
}

impl InitialUsageProvider for MeteredPlan {
    fn initial_usage(
        &self,
        _group: &str,
        _variation: VariationId,
        _cycle: Option<&BillingCycle>,
    ) -> i64 {
        self.initial
    }
}

pub struct TestSubscription {
    pub id: SubscriptionId,
    pub plan: MeteredPlan,
}

impl TestSubscription {
    pub fn new(plan: MeteredPlan) -> Arc<Self> {
        Arc::new(Self {
            id: SubscriptionId::new(),
            plan,
        })
    }
}

impl Subscription for TestSubscription {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn subscription_type(&self) -> &dyn SubscriptionType {
        &self.plan
    }
}

/// Install a subscriber once so test runs honor RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Assert that no two records' intervals intersect, comparing
/// `[start, end-or-unbounded]` ranges pairwise.
pub fn assert_non_overlapping(records: &[UsageRecord]) {
    for (i, a) in records.iter().enumerate() {
        for b in &records[i + 1..] {
            assert!(
                !a.overlaps(b),
                "records overlap: [{}, {:?}] and [{}, {:?}]",
                a.start,
                a.end,
                b.start,
                b.end
            );
        }
    }
}
