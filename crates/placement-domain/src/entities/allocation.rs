//! Allocation entity: a recorded consumption of provider inventory.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::ids::{ProviderId, ResourceClassId};

/// A recorded consumption of `used` units of `resource_class_id` on
/// `provider_id` by `consumer_id`. `used` is always `>= 1`; zero-quantity
/// allocations are not represented as rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Identifier of the consumer holding this allocation.
    pub consumer_id: Uuid,
    /// The provider this allocation draws from.
    pub provider_id: ProviderId,
    /// The resource class this allocation is denominated in.
    pub resource_class_id: ResourceClassId,
    /// Quantity consumed; always `>= 1`.
    pub used: u32,
}
