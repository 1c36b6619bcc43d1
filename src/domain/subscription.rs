//! Subscription collaborator interfaces
//!
//! The ledger does not own subscriptions or product variations; it stores
//! their identifiers and talks to them through the ports below. Capability
//! checks are explicit (an enum plus typed accessors) rather than runtime
//! reflection: a subscription type declares what it implements and usage
//! types verify their requirements at construction.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{SubscriptionId, VariationId};
use crate::domain::usage::group::UsageGroup;

/// Capabilities a subscription type can implement for usage groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionCapability {
    /// Supplies a per-cycle free allowance deducted before charging.
    FreeUsage,
    /// Supplies the seed quantity registered when a gauge starts or the
    /// subscription changes.
    InitialUsage,
}

impl SubscriptionCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionCapability::FreeUsage => "free-usage",
            SubscriptionCapability::InitialUsage => "initial-usage",
        }
    }
}

impl fmt::Display for SubscriptionCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free allowance supplier. Subscription types that want usage groups but no
/// free tier can simply return 0 for every group.
pub trait FreeUsageProvider: Send + Sync {
    fn free_quantity(&self, group_name: &str, variation: VariationId, cycle: &BillingCycle) -> i64;
}

/// Initial-quantity supplier for gauge registration. The cycle is absent when
/// the quantity is requested outside any particular cycle (subscription
/// activation or plan change).
pub trait InitialUsageProvider: Send + Sync {
    fn initial_usage(
        &self,
        group_name: &str,
        variation: VariationId,
        cycle: Option<&BillingCycle>,
    ) -> i64;
}

/// The type (plan family) of a subscription: which capabilities it implements
/// and which usage groups it declares.
pub trait SubscriptionType: Send + Sync {
    /// Machine name of this subscription type.
    fn id(&self) -> &str;

    /// Capabilities this subscription type implements.
    fn capabilities(&self) -> &[SubscriptionCapability];

    /// Usage groups declared by this subscription type.
    fn usage_groups(&self) -> Vec<UsageGroup> {
        Vec::new()
    }

    fn free_usage(&self) -> Option<&dyn FreeUsageProvider> {
        None
    }

    fn initial_usage(&self) -> Option<&dyn InitialUsageProvider> {
        None
    }

    fn has_capability(&self, capability: SubscriptionCapability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// A subscription instance owning usage groups.
pub trait Subscription: Send + Sync {
    fn id(&self) -> SubscriptionId;

    fn subscription_type(&self) -> &dyn SubscriptionType;
}

/// Resolves a subscription id to the subscription object. Records store only
/// identifiers; callers holding an id go through this port.
#[async_trait]
pub trait SubscriptionResolver: Send + Sync {
    async fn resolve(&self, id: SubscriptionId) -> Result<Arc<dyn Subscription>>;
}

/// Descriptor for a product variation, as surfaced by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductVariation {
    pub id: VariationId,
    pub sku: String,
}

/// Resolves a product variation id to its descriptor.
#[async_trait]
pub trait VariationResolver: Send + Sync {
    async fn resolve(&self, id: VariationId) -> Result<ProductVariation>;
}
