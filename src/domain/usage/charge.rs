//! Charge value object

use serde::{Deserialize, Serialize};

use crate::domain::shared::value_objects::VariationId;

/// Net billable quantity for one product variation within a billing cycle.
/// Free and initial allowances have already been deducted; the quantity is
/// never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub product_variation_id: VariationId,
    pub quantity: i64,
}

impl Charge {
    pub fn new(product_variation_id: VariationId, quantity: i64) -> Self {
        Self {
            product_variation_id,
            quantity,
        }
    }
}
