//! Immutable value objects exchanged across the domain boundary.

mod candidate;
mod request_group;

pub use candidate::{AllocationRequest, AllocationRequestEntry, ProviderResourceSummary, ProviderSummary};
pub use request_group::{RequestGroup, RequestGroups, UNSUFFIXED_GROUP_KEY};
