//! Per-key serialization of usage registration
//!
//! Gauge reconciliation reads the full interval set, rewrites it, and writes
//! it back; two interleaved registrations for the same group+subscription
//! could both read the same snapshot and violate the non-overlap invariant.
//! The registry hands out one async mutex per `(group, subscription)` key so
//! callers serialize the whole read-reconcile-write sequence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::shared::value_objects::SubscriptionId;

/// Registry of per-`(group, subscription)` locks. Cheap to clone behind an
/// `Arc`; guards are owned so they can be held across store awaits.
#[derive(Default)]
pub struct UsageLockRegistry {
    locks: Mutex<HashMap<(String, SubscriptionId), Arc<AsyncMutex<()>>>>,
}

impl UsageLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(
        &self,
        group_name: &str,
        subscription: SubscriptionId,
    ) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry((group_name.to_string(), subscription))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
