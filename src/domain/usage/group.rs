//! Usage group definitions

use serde::{Deserialize, Serialize};

use crate::domain::shared::value_objects::VariationId;

/// How usage accrues within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    /// Discrete, additive point-in-time events.
    Counter,
    /// A level that holds over an interval until explicitly superseded.
    Gauge,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Counter => "counter",
            UsageKind::Gauge => "gauge",
        }
    }
}

/// Static definition of a usage group (a named metric) declared by a
/// subscription type. New records registered through the group are billed
/// against its product variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageGroup {
    pub name: String,
    pub kind: UsageKind,
    pub product_variation_id: VariationId,
}

impl UsageGroup {
    pub fn new(name: impl Into<String>, kind: UsageKind, product_variation_id: VariationId) -> Self {
        Self {
            name: name.into(),
            kind,
            product_variation_id,
        }
    }
}
