//! Usage record entity
//!
//! One quantity bound to a time interval, a usage group, a subscription, and
//! a product variation. An absent end means "open-ended, still accruing" and
//! is a first-class state, not a sentinel value.

use serde::{Deserialize, Serialize};

use crate::domain::billing_cycle::BillingCycle;
use crate::domain::shared::value_objects::{RecordId, SubscriptionId, Timestamp, VariationId};

/// A single metered-usage entry.
///
/// `id` is `None` until the storage backend assigns one on first insert; id
/// presence is the sole signal storage uses to choose insert vs. update.
/// Fetched records are working copies - nothing reaches storage except
/// through the store's batch operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Option<RecordId>,
    pub group_name: String,
    pub subscription_id: SubscriptionId,
    pub product_variation_id: VariationId,
    pub quantity: i64,
    pub start: Timestamp,
    pub end: Option<Timestamp>,
}

impl UsageRecord {
    /// A new, unpersisted record starting at `start` with no end.
    pub fn new(
        group_name: impl Into<String>,
        subscription_id: SubscriptionId,
        product_variation_id: VariationId,
        quantity: i64,
        start: Timestamp,
    ) -> Self {
        Self {
            id: None,
            group_name: group_name.into(),
            subscription_id,
            product_variation_id,
            quantity,
            start,
            end: None,
        }
    }

    pub fn with_end(mut self, end: Timestamp) -> Self {
        self.end = Some(end);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    /// Inclusive covered length in seconds; `None` while still accruing.
    pub fn length_secs(&self) -> Option<i64> {
        self.end.map(|end| end - self.start + 1)
    }

    /// Whether this record's interval intersects `other`'s, comparing
    /// `[start, end-or-unbounded]` ranges.
    pub fn overlaps(&self, other: &UsageRecord) -> bool {
        let self_end = self.end.unwrap_or(Timestamp::MAX);
        let other_end = other.end.unwrap_or(Timestamp::MAX);
        self.start <= other_end && other.start <= self_end
    }

    pub fn covers(&self, instant: Timestamp) -> bool {
        self.start <= instant && self.end.map_or(true, |end| instant <= end)
    }

    /// Clip this in-memory copy to the cycle bounds: the start is raised to
    /// the cycle start, and a missing or overlong end becomes the cycle end.
    /// Clipped copies are never written back.
    pub fn clip_to(&mut self, cycle: &BillingCycle) {
        if self.start < cycle.start() {
            self.start = cycle.start();
        }
        match self.end {
            None => self.end = Some(cycle.end()),
            Some(end) if end > cycle.end() => self.end = Some(cycle.end()),
            Some(_) => {}
        }
    }
}
