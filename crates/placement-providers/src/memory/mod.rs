//! In-memory [`ProviderGraphStore`]/[`ResourceClassStore`]/[`TraitStore`]
//! implementation.
//!
//! The primary non-SQL backend: used directly by callers who don't need
//! durability (tests, single-process demos) and as the reference against
//! which [`crate::sqlite`] is checked for behavioral parity.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use placement_domain::entities::{
    Allocation, AggregateId, InventoryRecord, ProviderId, ResourceClass, ResourceClassId,
    ResourceProvider, Trait, TraitId, CUSTOM_RESOURCE_CLASS_PREFIX, CUSTOM_TRAIT_PREFIX,
    MISC_SHARES_VIA_AGGREGATE, STANDARD_TRAITS,
};
use placement_domain::error::{Error, Result};
use placement_domain::ports::{
    ProviderGraphStore, ProviderTreeNode, RequestContext, ResourceClassStore, TraitStore,
};

fn sharing_trait_id() -> TraitId {
    TraitId::Standard(
        STANDARD_TRAITS
            .iter()
            .position(|name| *name == MISC_SHARES_VIA_AGGREGATE)
            .expect("MISC_SHARES_VIA_AGGREGATE is a standard trait") as u16,
    )
}

#[derive(Default)]
struct State {
    providers: HashMap<ProviderId, ResourceProvider>,
    by_uuid: HashMap<Uuid, ProviderId>,
    inventories: HashMap<(ProviderId, ResourceClassId), InventoryRecord>,
    allocations: HashMap<(Uuid, ProviderId, ResourceClassId), u32>,
    traits: HashMap<ProviderId, HashSet<TraitId>>,
    aggregates: HashMap<ProviderId, HashSet<AggregateId>>,
    custom_resource_classes: Vec<ResourceClass>,
    custom_traits: Vec<Trait>,
}

impl State {
    fn used_of(&self, provider_id: ProviderId, resource_class_id: ResourceClassId) -> u32 {
        self.allocations
            .iter()
            .filter(|((_, p, c), _)| *p == provider_id && *c == resource_class_id)
            .map(|(_, used)| *used)
            .sum()
    }

    fn traits_of(&self, provider_id: ProviderId) -> HashSet<TraitId> {
        self.traits.get(&provider_id).cloned().unwrap_or_default()
    }

    fn aggregates_of(&self, provider_id: ProviderId) -> HashSet<AggregateId> {
        self.aggregates
            .get(&provider_id)
            .cloned()
            .unwrap_or_default()
    }

    fn node_for(&self, provider: &ResourceProvider) -> ProviderTreeNode {
        let inventories: Vec<InventoryRecord> = self
            .inventories
            .values()
            .filter(|inv| inv.provider_id == provider.id)
            .copied()
            .collect();
        let used = inventories
            .iter()
            .map(|inv| (inv.resource_class_id, self.used_of(provider.id, inv.resource_class_id)))
            .collect();
        ProviderTreeNode {
            provider: provider.clone(),
            inventories,
            used,
            trait_ids: self.traits_of(provider.id),
            aggregate_ids: self.aggregates_of(provider.id),
        }
    }

    fn satisfies_resources_alone(
        &self,
        provider_id: ProviderId,
        resources: &[(ResourceClassId, u32)],
    ) -> bool {
        resources.iter().all(|(class, amount)| {
            self.inventories
                .get(&(provider_id, *class))
                .is_some_and(|inv| {
                    placement_domain::inventory::is_satisfiable(
                        inv,
                        self.used_of(provider_id, *class),
                        *amount,
                    )
                })
        })
    }

    /// `true` if `provider_id` can cover `class`/`amount` either on its
    /// own inventory or through a sharing provider reachable via a
    /// shared aggregate.
    fn satisfies_class(&self, provider_id: ProviderId, class: ResourceClassId, amount: u32) -> bool {
        if let Some(inv) = self.inventories.get(&(provider_id, class)) {
            if placement_domain::inventory::is_satisfiable(
                inv,
                self.used_of(provider_id, class),
                amount,
            ) {
                return true;
            }
        }
        let provider_aggregates = self.aggregates_of(provider_id);
        if provider_aggregates.is_empty() {
            return false;
        }
        self.providers.values().any(|candidate| {
            self.traits_of(candidate.id).contains(&sharing_trait_id())
                && !self
                    .aggregates_of(candidate.id)
                    .is_disjoint(&provider_aggregates)
                && self
                    .inventories
                    .get(&(candidate.id, class))
                    .is_some_and(|inv| {
                        placement_domain::inventory::is_satisfiable(
                            inv,
                            self.used_of(candidate.id, class),
                            amount,
                        )
                    })
        })
    }

    fn member_of_satisfied(&self, provider_id: ProviderId, member_of: &[HashSet<AggregateId>]) -> bool {
        let provider_aggregates = self.aggregates_of(provider_id);
        member_of
            .iter()
            .all(|inner| !inner.is_disjoint(&provider_aggregates))
    }

    fn root_of(&self, provider_id: ProviderId) -> ProviderId {
        self.providers
            .get(&provider_id)
            .map(ResourceProvider::root_id_or_self)
            .unwrap_or(provider_id)
    }

    fn next_provider_id(&self) -> ProviderId {
        let next = self.providers.keys().map(|id| id.0).max().unwrap_or(0) + 1;
        ProviderId(next)
    }

    fn bump_generation(&mut self, provider_id: ProviderId) -> Result<u32> {
        let provider = self
            .providers
            .get_mut(&provider_id)
            .ok_or_else(|| Error::internal(format!("unknown provider {provider_id:?}")))?;
        provider.generation += 1;
        Ok(provider.generation)
    }

    fn check_generation(&self, provider_id: ProviderId, observed_generation: u32) -> Result<()> {
        let provider = self
            .providers
            .get(&provider_id)
            .ok_or_else(|| Error::internal(format!("unknown provider {provider_id:?}")))?;
        if provider.generation != observed_generation {
            return Err(Error::ConcurrentUpdateDetected {
                provider_id: provider_id.0,
            });
        }
        Ok(())
    }
}

/// In-memory provider graph, guarded by a single mutex. Never contends in
/// practice: every operation here is a synchronous map walk with no I/O.
pub struct MemoryGraphStore {
    state: Mutex<State>,
    next_custom_resource_class_id: AtomicI64,
    next_custom_trait_id: AtomicI64,
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraphStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            next_custom_resource_class_id: AtomicI64::new(1),
            next_custom_trait_id: AtomicI64::new(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

#[async_trait]
impl ProviderGraphStore for MemoryGraphStore {
    async fn list_providers_matching(
        &self,
        ctx: &RequestContext,
        resources: &[(ResourceClassId, u32)],
        required_trait_ids: &[TraitId],
        forbidden_trait_ids: &[TraitId],
        member_of: &[HashSet<AggregateId>],
    ) -> Result<Vec<(ProviderId, ProviderId)>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let state = self.lock();
        let sharing = sharing_trait_id();
        let mut out = Vec::new();
        for provider in state.providers.values() {
            let traits = state.traits_of(provider.id);
            if traits.contains(&sharing) {
                continue;
            }
            if !required_trait_ids.iter().all(|t| traits.contains(t)) {
                continue;
            }
            if forbidden_trait_ids.iter().any(|t| traits.contains(t)) {
                continue;
            }
            if !state.member_of_satisfied(provider.id, member_of) {
                continue;
            }
            let satisfied = resources
                .iter()
                .all(|(class, amount)| state.satisfies_class(provider.id, *class, *amount));
            if satisfied {
                out.push((provider.id, state.root_of(provider.id)));
            }
        }
        out.sort_by_key(|(provider_id, _)| *provider_id);
        Ok(out)
    }

    async fn list_providers_with_any_trait(
        &self,
        ctx: &RequestContext,
        trait_ids: &[TraitId],
    ) -> Result<Vec<ProviderId>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let state = self.lock();
        let mut out: Vec<ProviderId> = state
            .providers
            .values()
            .filter(|p| {
                let traits = state.traits_of(p.id);
                trait_ids.iter().any(|t| traits.contains(t))
            })
            .map(|p| p.id)
            .collect();
        out.sort();
        Ok(out)
    }

    async fn list_providers_having_all_traits(
        &self,
        ctx: &RequestContext,
        trait_ids: &[TraitId],
    ) -> Result<Vec<ProviderId>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        if trait_ids.is_empty() {
            return Err(Error::bad_request(
                "list_providers_having_all_traits requires at least one trait id",
            ));
        }
        let state = self.lock();
        let mut out: Vec<ProviderId> = state
            .providers
            .values()
            .filter(|p| {
                let traits = state.traits_of(p.id);
                trait_ids.iter().all(|t| traits.contains(t))
            })
            .map(|p| p.id)
            .collect();
        out.sort();
        Ok(out)
    }

    async fn get_tree_providers(
        &self,
        ctx: &RequestContext,
        root_ids: &[ProviderId],
    ) -> Result<Vec<ProviderTreeNode>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let state = self.lock();
        let roots: HashSet<ProviderId> = root_ids.iter().copied().collect();
        let mut out: Vec<ProviderTreeNode> = state
            .providers
            .values()
            .filter(|p| roots.contains(&p.root_id_or_self()) || roots.contains(&p.id))
            .map(|p| state.node_for(p))
            .collect();
        out.sort_by_key(|node| node.provider.id);
        Ok(out)
    }

    async fn get_sharing_providers(
        &self,
        ctx: &RequestContext,
        resource_class_id: ResourceClassId,
    ) -> Result<Vec<(ProviderId, AggregateId)>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let state = self.lock();
        let sharing = sharing_trait_id();
        let mut out = Vec::new();
        for provider in state.providers.values() {
            if !state.traits_of(provider.id).contains(&sharing) {
                continue;
            }
            if !state
                .inventories
                .contains_key(&(provider.id, resource_class_id))
            {
                continue;
            }
            for aggregate_id in state.aggregates_of(provider.id) {
                out.push((provider.id, aggregate_id));
            }
        }
        out.sort();
        Ok(out)
    }

    async fn trees_with_traits(
        &self,
        ctx: &RequestContext,
        candidate_provider_ids: &[ProviderId],
        required: &[TraitId],
        forbidden: &[TraitId],
    ) -> Result<Vec<(ProviderId, ProviderId)>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let state = self.lock();
        let mut out = Vec::new();
        for &provider_id in candidate_provider_ids {
            let root_id = state.root_of(provider_id);
            let tree_traits: HashSet<TraitId> = state
                .providers
                .values()
                .filter(|p| p.root_id_or_self() == root_id)
                .flat_map(|p| state.traits_of(p.id))
                .collect();
            if required.iter().all(|t| tree_traits.contains(t))
                && !forbidden.iter().any(|t| tree_traits.contains(t))
            {
                out.push((provider_id, root_id));
            }
        }
        out.sort_by_key(|(provider_id, _)| *provider_id);
        Ok(out)
    }

    async fn create_provider(
        &self,
        _ctx: &RequestContext,
        name: &str,
        parent_id: Option<ProviderId>,
    ) -> Result<ResourceProvider> {
        let mut state = self.lock();
        let id = state.next_provider_id();
        let root_id = match parent_id {
            Some(parent) => Some(state.root_of(parent)),
            None => Some(id),
        };
        let provider = ResourceProvider {
            id,
            uuid: Uuid::new_v4(),
            name: name.to_owned(),
            parent_id,
            root_id,
            generation: 0,
        };
        state.by_uuid.insert(provider.uuid, id);
        state.providers.insert(id, provider.clone());
        Ok(provider)
    }

    async fn update_provider(
        &self,
        _ctx: &RequestContext,
        provider: &ResourceProvider,
        observed_generation: u32,
    ) -> Result<ResourceProvider> {
        let mut state = self.lock();
        state.check_generation(provider.id, observed_generation)?;
        let generation = state.bump_generation(provider.id)?;
        let mut updated = provider.clone();
        updated.generation = generation;
        state.providers.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn destroy_provider(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        observed_generation: u32,
    ) -> Result<()> {
        let mut state = self.lock();
        state.check_generation(provider_id, observed_generation)?;
        if let Some(provider) = state.providers.remove(&provider_id) {
            state.by_uuid.remove(&provider.uuid);
        }
        state
            .inventories
            .retain(|(p, _), _| *p != provider_id);
        state
            .allocations
            .retain(|(_, p, _), _| *p != provider_id);
        state.traits.remove(&provider_id);
        state.aggregates.remove(&provider_id);
        Ok(())
    }

    async fn set_aggregates(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        aggregate_ids: HashSet<AggregateId>,
        observed_generation: u32,
    ) -> Result<u32> {
        let mut state = self.lock();
        state.check_generation(provider_id, observed_generation)?;
        state.aggregates.insert(provider_id, aggregate_ids);
        state.bump_generation(provider_id)
    }

    async fn set_traits(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        trait_ids: HashSet<TraitId>,
        observed_generation: u32,
    ) -> Result<u32> {
        let mut state = self.lock();
        state.check_generation(provider_id, observed_generation)?;
        state.traits.insert(provider_id, trait_ids);
        state.bump_generation(provider_id)
    }

    async fn add_inventory(
        &self,
        _ctx: &RequestContext,
        record: InventoryRecord,
        observed_generation: u32,
    ) -> Result<u32> {
        record.validate()?;
        let mut state = self.lock();
        state.check_generation(record.provider_id, observed_generation)?;
        state
            .inventories
            .insert((record.provider_id, record.resource_class_id), record);
        state.bump_generation(record.provider_id)
    }

    async fn record_allocation(
        &self,
        _ctx: &RequestContext,
        allocation: Allocation,
        observed_generation: u32,
    ) -> Result<u32> {
        if allocation.used == 0 {
            return Err(Error::bad_request("allocation amount must be at least 1"));
        }
        let mut state = self.lock();
        state.check_generation(allocation.provider_id, observed_generation)?;
        state.allocations.insert(
            (
                allocation.consumer_id,
                allocation.provider_id,
                allocation.resource_class_id,
            ),
            allocation.used,
        );
        state.bump_generation(allocation.provider_id)
    }
}

#[async_trait]
impl ResourceClassStore for MemoryGraphStore {
    async fn list_custom_resource_classes(&self) -> Result<Vec<ResourceClass>> {
        Ok(self.lock().custom_resource_classes.clone())
    }

    async fn create_custom_resource_class(&self, name: &str) -> Result<ResourceClass> {
        if !name.starts_with(CUSTOM_RESOURCE_CLASS_PREFIX) {
            return Err(Error::bad_request(format!(
                "custom resource class name must start with {CUSTOM_RESOURCE_CLASS_PREFIX}"
            )));
        }
        let mut state = self.lock();
        if state
            .custom_resource_classes
            .iter()
            .any(|class| class.name == name)
        {
            return Err(Error::bad_request(format!(
                "resource class name already in use: {name}"
            )));
        }
        let id = ResourceClassId::Custom(
            self.next_custom_resource_class_id.fetch_add(1, Ordering::SeqCst),
        );
        let class = ResourceClass {
            id,
            name: name.to_owned(),
        };
        state.custom_resource_classes.push(class.clone());
        Ok(class)
    }
}

#[async_trait]
impl TraitStore for MemoryGraphStore {
    async fn list_custom_traits(&self) -> Result<Vec<Trait>> {
        Ok(self.lock().custom_traits.clone())
    }

    async fn create_custom_trait(&self, name: &str) -> Result<Trait> {
        if !name.starts_with(CUSTOM_TRAIT_PREFIX) {
            return Err(Error::bad_request(format!(
                "custom trait name must start with {CUSTOM_TRAIT_PREFIX}"
            )));
        }
        let mut state = self.lock();
        if state.custom_traits.iter().any(|t| t.name == name) {
            return Err(Error::bad_request(format!(
                "trait name already in use: {name}"
            )));
        }
        let id = TraitId::Custom(self.next_custom_trait_id.fetch_add(1, Ordering::SeqCst));
        let t = Trait {
            id,
            name: name.to_owned(),
        };
        state.custom_traits.push(t.clone());
        Ok(t)
    }
}
