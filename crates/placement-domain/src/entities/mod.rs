//! Core domain entities: resource classes, traits, providers, inventory
//! records and allocations.

mod allocation;
mod ids;
mod inventory;
mod provider;
mod resource_class;
mod trait_def;

pub use allocation::Allocation;
pub use ids::{AggregateId, ProviderId, ResourceClassId, TraitId};
pub use inventory::InventoryRecord;
pub use provider::ResourceProvider;
pub use resource_class::{ResourceClass, CUSTOM_RESOURCE_CLASS_PREFIX, STANDARD_RESOURCE_CLASSES};
pub use trait_def::{Trait, CUSTOM_TRAIT_PREFIX, MISC_SHARES_VIA_AGGREGATE, STANDARD_TRAITS};
