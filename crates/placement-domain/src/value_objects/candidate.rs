//! Output value objects: allocation requests and provider summaries.

use uuid::Uuid;

/// One `(provider, resource_class, amount)` entry within an allocation
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequestEntry {
    /// The provider this entry draws from.
    pub provider_uuid: Uuid,
    /// The resource class name this entry is denominated in.
    pub resource_class: String,
    /// The quantity drawn from `provider_uuid`.
    pub amount: u32,
}

/// One concrete allocation candidate: an ordered list of entries summing,
/// per resource class, to the requested amount. A given resource class
/// name appears at most once (spec §4.5.4, invariant 2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationRequest {
    /// The entries making up this request.
    pub entries: Vec<AllocationRequestEntry>,
}

impl AllocationRequest {
    /// Build a request from its entries.
    #[must_use]
    pub fn new(entries: Vec<AllocationRequestEntry>) -> Self {
        Self { entries }
    }

    /// The distinct set of provider uuids referenced by this request, in
    /// first-seen order.
    #[must_use]
    pub fn provider_uuids(&self) -> Vec<Uuid> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for entry in &self.entries {
            if seen.insert(entry.provider_uuid) {
                out.push(entry.provider_uuid);
            }
        }
        out
    }

    /// A sorted, deduplication-stable key used to detect candidates that
    /// are equal as *sets* of `(provider, class, amount)` tuples even if
    /// enumerated in a different order.
    #[must_use]
    pub fn dedup_key(&self) -> Vec<(Uuid, String, u32)> {
        let mut key: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.provider_uuid, e.resource_class.clone(), e.amount))
            .collect();
        key.sort();
        key
    }
}

/// Observed capacity/usage for one resource class on one provider, as
/// reported in a provider summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResourceSummary {
    /// Resource class name.
    pub resource_class: String,
    /// Effective capacity (see spec §4.4).
    pub capacity: u32,
    /// Sum of `used` across all allocations of this class on this
    /// provider.
    pub used: u32,
}

/// Capacity/usage/trait snapshot for one provider appearing in any
/// retained allocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSummary {
    /// The provider this summary describes.
    pub provider_uuid: Uuid,
    /// Every inventory this provider carries, not only the classes
    /// requested.
    pub resources: Vec<ProviderResourceSummary>,
    /// The complete set of trait names this provider bears.
    pub traits: Vec<String>,
}
