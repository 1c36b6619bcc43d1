//! Usage type interface
//!
//! The two variants (Counter, Gauge) share this surface; callers hold a
//! `dyn UsageType` and never branch on the concrete kind.

use async_trait::async_trait;

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::error::UsageError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::Timestamp;
use crate::domain::subscription::{Subscription, SubscriptionCapability};
use crate::domain::usage::charge::Charge;

#[async_trait]
pub trait UsageType: Send + Sync {
    /// Name of the usage group this instance serves.
    fn group_name(&self) -> &str;

    /// Capabilities the owning subscription's type must provide.
    fn required_capabilities(&self) -> &'static [SubscriptionCapability];

    /// Register usage. Counter groups record a point event at `start` and
    /// ignore `end`; gauge groups reconcile the interval against the
    /// existing timeline.
    async fn add_usage(&self, quantity: i64, start: Timestamp, end: Option<Timestamp>)
        -> Result<()>;

    /// The usage level or total for the cycle; with no cycle, across all
    /// recorded history.
    async fn current_usage(&self, cycle: Option<&BillingCycle>) -> Result<i64>;

    /// Net per-variation billable quantities for the cycle.
    async fn charges(&self, cycle: &BillingCycle) -> Result<Vec<Charge>>;

    /// Whether the cycle can be billed yet. Types without record
    /// completeness requirements treat every cycle as billable.
    async fn is_complete(&self, _cycle: &BillingCycle) -> Result<bool> {
        Ok(true)
    }

    /// Hook invoked when the owning subscription's plan or state changes.
    async fn on_subscription_change(&self, _effective_at: Timestamp) -> Result<()> {
        Ok(())
    }

    /// Whether a change to `property` must be scheduled for the next cycle
    /// instead of applied immediately. Usage groups do not enforce change
    /// scheduling unless they override this.
    fn enforce_change_scheduling(&self, _property: &str, _old: &str, _new: &str) -> bool {
        false
    }
}

/// Verify at construction that the subscription's type carries every
/// capability `required` names, with the matching provider actually wired
/// up. A violation is a programmer error surfaced immediately, not a
/// runtime condition to recover from.
pub(crate) fn require_capabilities(
    subscription: &dyn Subscription,
    group_name: &str,
    required: &[SubscriptionCapability],
) -> Result<()> {
    let subscription_type = subscription.subscription_type();
    for capability in required {
        let provided = subscription_type.has_capability(*capability)
            && match capability {
                SubscriptionCapability::FreeUsage => subscription_type.free_usage().is_some(),
                SubscriptionCapability::InitialUsage => {
                    subscription_type.initial_usage().is_some()
                }
            };
        if !provided {
            return Err(UsageError::Configuration(format!(
                "usage group '{group_name}' requires subscription type '{}' to provide {capability}",
                subscription_type.id()
            )));
        }
    }
    Ok(())
}

/// Reject invalid registration input before any storage is touched.
pub(crate) fn validate_usage_input(
    quantity: i64,
    start: Timestamp,
    end: Option<Timestamp>,
) -> Result<()> {
    if quantity < 0 {
        return Err(UsageError::InvalidInterval(format!(
            "negative usage quantity {quantity}"
        )));
    }
    if let Some(end) = end {
        if end < start {
            return Err(UsageError::InvalidInterval(format!(
                "record ends ({end}) before it starts ({start})"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_usage_input() {
        assert!(validate_usage_input(0, 10, None).is_ok());
        assert!(validate_usage_input(5, 10, Some(10)).is_ok());
        assert!(validate_usage_input(-1, 10, None).is_err());
        assert!(validate_usage_input(5, 10, Some(9)).is_err());
    }
}
