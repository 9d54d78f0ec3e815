//! Inventory record entity: the raw, stored capacity fields for a single
//! `(provider, resource_class)` pair.

use serde::{Deserialize, Serialize};

use crate::entities::ids::{ProviderId, ResourceClassId};
use crate::error::{Error, Result};

/// The stored inventory fields for a single `(provider, resource_class)`
/// pair. Two inventory records for the same pair must never coexist; that
/// is an invariant the provider graph store is responsible for enforcing,
/// not this type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// The provider this inventory belongs to.
    pub provider_id: ProviderId,
    /// The resource class this inventory is denominated in.
    pub resource_class_id: ResourceClassId,
    /// Total physical quantity.
    pub total: u32,
    /// Quantity reserved and never offered for allocation.
    pub reserved: u32,
    /// Smallest request size this inventory will accept.
    pub min_unit: u32,
    /// Largest request size this inventory will accept.
    pub max_unit: u32,
    /// Requests must be an exact multiple of this step.
    pub step_size: u32,
    /// Multiplier applied to `(total - reserved)` to get effective
    /// capacity. Must be non-negative; applied in double precision.
    pub allocation_ratio: f64,
}

impl InventoryRecord {
    /// Validate the invariants from spec §3: `reserved <= total`,
    /// `min_unit >= 1`, `max_unit >= min_unit`, `step_size >= 1`, and a
    /// non-negative allocation ratio.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if any invariant is violated. These are
    /// treated as invariant violations (bugs in the stored data or in a
    /// caller constructing a record directly), not ordinary input errors.
    pub fn validate(&self) -> Result<()> {
        if self.reserved > self.total {
            return Err(Error::internal(format!(
                "inventory reserved ({}) exceeds total ({}) for provider {:?} class {:?}",
                self.reserved, self.total, self.provider_id, self.resource_class_id
            )));
        }
        if self.min_unit < 1 {
            return Err(Error::internal(
                "inventory min_unit must be at least 1".to_owned(),
            ));
        }
        if self.max_unit < self.min_unit {
            return Err(Error::internal(format!(
                "inventory max_unit ({}) is less than min_unit ({})",
                self.max_unit, self.min_unit
            )));
        }
        if self.step_size < 1 {
            return Err(Error::internal(
                "inventory step_size must be at least 1".to_owned(),
            ));
        }
        if self.allocation_ratio < 0.0 {
            return Err(Error::internal(
                "inventory allocation_ratio must be non-negative".to_owned(),
            ));
        }
        Ok(())
    }
}
