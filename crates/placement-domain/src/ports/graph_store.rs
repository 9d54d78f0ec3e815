//! The persistence port consumed by the candidate matcher: the provider
//! graph store. Implemented by `placement-providers`.

use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;

use crate::entities::{
    Allocation, AggregateId, InventoryRecord, ProviderId, ResourceClassId, ResourceProvider,
    TraitId,
};
use crate::error::Result;

/// Carries a deadline and (opaque, unauthenticated-by-this-crate)
/// credentials alongside every persistence call, per spec §6.
///
/// Authentication/authorization is explicitly out of scope for this
/// engine (spec §1); `credentials` is threaded through so a surrounding
/// service can attach whatever it needs without the engine inspecting it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Absolute instant by which the operation must complete.
    pub deadline: Option<Instant>,
    /// Opaque credential/context token forwarded to the storage backend.
    pub credentials: Option<String>,
}

impl RequestContext {
    /// A context with no deadline and no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a credentials token.
    #[must_use]
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// `true` if the deadline, if any, has already passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// A provider as returned by [`ProviderGraphStore::get_tree_providers`]:
/// the provider row plus its inventories, traits and aggregate
/// memberships, fetched together to avoid N+1 round trips during tree
/// expansion.
#[derive(Debug, Clone)]
pub struct ProviderTreeNode {
    /// The provider row.
    pub provider: ResourceProvider,
    /// This provider's own inventory records.
    pub inventories: Vec<InventoryRecord>,
    /// Current used amount per resource class, as recorded by existing
    /// allocations against this provider. Absent classes have zero used.
    pub used: std::collections::HashMap<ResourceClassId, u32>,
    /// The traits this provider bears.
    pub trait_ids: HashSet<TraitId>,
    /// The aggregates this provider belongs to.
    pub aggregate_ids: HashSet<AggregateId>,
}

impl ProviderTreeNode {
    /// Amount already used of `resource_class_id` on this provider.
    #[must_use]
    pub fn used_of(&self, resource_class_id: ResourceClassId) -> u32 {
        self.used.get(&resource_class_id).copied().unwrap_or(0)
    }

    /// This provider's inventory record for `resource_class_id`, if any.
    #[must_use]
    pub fn inventory_of(&self, resource_class_id: ResourceClassId) -> Option<&InventoryRecord> {
        self.inventories
            .iter()
            .find(|inv| inv.resource_class_id == resource_class_id)
    }
}

/// Read/write predicates over the provider graph: providers, their
/// parent/child links, aggregate memberships, inventories, allocations and
/// trait associations.
///
/// All write operations bump the affected provider's `generation`; every
/// write here takes the `observed_generation` the caller last read and
/// fails with [`crate::error::Error::ConcurrentUpdateDetected`] if it no
/// longer matches, per spec §5/§9.
#[async_trait]
pub trait ProviderGraphStore: Send + Sync {
    /// Enumerate `(provider_id, root_id)` pairs for non-sharing providers
    /// whose own inventory (possibly combined with sharing providers in a
    /// common aggregate) can satisfy every `(resource_class_id, amount)`
    /// pair, optionally narrowed by trait and `member_of` constraints.
    ///
    /// An empty `resources` slice imposes no inventory requirement at all,
    /// degrading this into a pure trait/`member_of` membership query; the
    /// matcher relies on this to enumerate tree members reachable through
    /// a given aggregate without requiring they carry any particular
    /// class's inventory themselves (spec §4.5.3 step 1, anchor
    /// discovery).
    async fn list_providers_matching(
        &self,
        ctx: &RequestContext,
        resources: &[(ResourceClassId, u32)],
        required_trait_ids: &[TraitId],
        forbidden_trait_ids: &[TraitId],
        member_of: &[HashSet<AggregateId>],
    ) -> Result<Vec<(ProviderId, ProviderId)>>;

    /// Providers bearing at least one of `trait_ids`.
    async fn list_providers_with_any_trait(
        &self,
        ctx: &RequestContext,
        trait_ids: &[TraitId],
    ) -> Result<Vec<ProviderId>>;

    /// Providers bearing every one of `trait_ids`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::BadRequest`] if `trait_ids` is
    /// empty — an empty "must have all of nothing" query is meaningless
    /// and must fail rather than silently match everything.
    async fn list_providers_having_all_traits(
        &self,
        ctx: &RequestContext,
        trait_ids: &[TraitId],
    ) -> Result<Vec<ProviderId>>;

    /// For the given root ids, return every provider in those trees with
    /// inventories, traits and aggregates attached.
    async fn get_tree_providers(
        &self,
        ctx: &RequestContext,
        root_ids: &[ProviderId],
    ) -> Result<Vec<ProviderTreeNode>>;

    /// Sharing providers (bearing `MISC_SHARES_VIA_AGGREGATE`) that carry
    /// inventory of `resource_class_id`, paired with the aggregate they
    /// are reachable through.
    async fn get_sharing_providers(
        &self,
        ctx: &RequestContext,
        resource_class_id: ResourceClassId,
    ) -> Result<Vec<(ProviderId, AggregateId)>>;

    /// Among `candidate_provider_ids`, return `(provider_id, root_id)`
    /// pairs for trees whose union of traits (across every provider in
    /// the tree) satisfies `required` and contains none of `forbidden`.
    ///
    /// Callers must still re-verify per-provider trait containment on the
    /// resulting candidates: trait satisfaction may be split across
    /// providers in the same tree (spec §9 open question), so this is a
    /// coarse pre-filter, not a final answer.
    async fn trees_with_traits(
        &self,
        ctx: &RequestContext,
        candidate_provider_ids: &[ProviderId],
        required: &[TraitId],
        forbidden: &[TraitId],
    ) -> Result<Vec<(ProviderId, ProviderId)>>;

    /// Create a new provider, optionally under `parent_id`.
    async fn create_provider(
        &self,
        ctx: &RequestContext,
        name: &str,
        parent_id: Option<ProviderId>,
    ) -> Result<ResourceProvider>;

    /// Update a provider's mutable fields (currently: name, parent).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::ConcurrentUpdateDetected`] if
    /// `observed_generation` no longer matches the stored generation.
    async fn update_provider(
        &self,
        ctx: &RequestContext,
        provider: &ResourceProvider,
        observed_generation: u32,
    ) -> Result<ResourceProvider>;

    /// Destroy a provider and everything hanging off it (inventories,
    /// trait associations, aggregate memberships).
    async fn destroy_provider(
        &self,
        ctx: &RequestContext,
        provider_id: ProviderId,
        observed_generation: u32,
    ) -> Result<()>;

    /// Replace a provider's aggregate memberships wholesale. Returns the
    /// provider's new generation.
    async fn set_aggregates(
        &self,
        ctx: &RequestContext,
        provider_id: ProviderId,
        aggregate_ids: HashSet<AggregateId>,
        observed_generation: u32,
    ) -> Result<u32>;

    /// Replace a provider's trait associations wholesale. Returns the
    /// provider's new generation.
    async fn set_traits(
        &self,
        ctx: &RequestContext,
        provider_id: ProviderId,
        trait_ids: HashSet<TraitId>,
        observed_generation: u32,
    ) -> Result<u32>;

    /// Add or replace an inventory record for `(record.provider_id,
    /// record.resource_class_id)`. Returns the provider's new generation.
    async fn add_inventory(
        &self,
        ctx: &RequestContext,
        record: InventoryRecord,
        observed_generation: u32,
    ) -> Result<u32>;

    /// Record an allocation. Returns the provider's new generation.
    async fn record_allocation(
        &self,
        ctx: &RequestContext,
        allocation: Allocation,
        observed_generation: u32,
    ) -> Result<u32>;
}
