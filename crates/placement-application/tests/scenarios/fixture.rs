//! An in-memory [`ProviderGraphStore`] fixture for candidate-matcher
//! scenario tests. Not a production backend — see `placement-providers`
//! for that — just enough storage to build deterministic test graphs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use placement_domain::entities::{
    Allocation, AggregateId, InventoryRecord, ProviderId, ResourceClass, ResourceClassId,
    ResourceProvider, Trait, TraitId,
};
use placement_domain::error::Result;
use placement_domain::ports::{
    ProviderGraphStore, ProviderTreeNode, RequestContext, ResourceClassStore, TraitStore,
};

/// A catalog store with no custom resource classes or traits: every
/// scenario test below only needs the standard catalogue.
#[derive(Default)]
pub struct EmptyCatalogStore;

#[async_trait]
impl ResourceClassStore for EmptyCatalogStore {
    async fn list_custom_resource_classes(&self) -> Result<Vec<ResourceClass>> {
        Ok(Vec::new())
    }

    async fn create_custom_resource_class(&self, _name: &str) -> Result<ResourceClass> {
        unimplemented!("not exercised by scenario tests")
    }
}

#[async_trait]
impl TraitStore for EmptyCatalogStore {
    async fn list_custom_traits(&self) -> Result<Vec<Trait>> {
        Ok(Vec::new())
    }

    async fn create_custom_trait(&self, _name: &str) -> Result<Trait> {
        unimplemented!("not exercised by scenario tests")
    }
}

#[derive(Default)]
struct State {
    providers: Vec<ResourceProvider>,
    inventories: HashMap<(ProviderId, ResourceClassId), InventoryRecord>,
    used: HashMap<(ProviderId, ResourceClassId), u32>,
    traits: HashMap<ProviderId, HashSet<TraitId>>,
    aggregates: HashMap<ProviderId, HashSet<AggregateId>>,
    next_id: i64,
}

/// A hand-built, mutable provider graph used as a [`ProviderGraphStore`]
/// in tests.
#[derive(Default)]
pub struct FakeGraphStore {
    state: Mutex<State>,
}

impl FakeGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root provider (no parent) and return it.
    pub fn add_root(&self, name: &str) -> ResourceProvider {
        self.add_provider(name, None)
    }

    /// Add a child provider under `parent`.
    pub fn add_child(&self, name: &str, parent: &ResourceProvider) -> ResourceProvider {
        self.add_provider(name, Some(parent.id))
    }

    fn add_provider(&self, name: &str, parent_id: Option<ProviderId>) -> ResourceProvider {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = ProviderId(state.next_id);
        let root_id = parent_id
            .and_then(|pid| {
                state
                    .providers
                    .iter()
                    .find(|p| p.id == pid)
                    .map(ResourceProvider::root_id_or_self)
            })
            .unwrap_or(id);
        let provider = ResourceProvider {
            id,
            uuid: Uuid::new_v4(),
            name: name.to_owned(),
            parent_id,
            root_id: Some(root_id),
            generation: 0,
        };
        state.providers.push(provider.clone());
        provider
    }

    pub fn add_inventory(
        &self,
        provider: &ResourceProvider,
        resource_class_id: ResourceClassId,
        total: u32,
        allocation_ratio: f64,
    ) {
        let mut state = self.state.lock().unwrap();
        state.inventories.insert(
            (provider.id, resource_class_id),
            InventoryRecord {
                provider_id: provider.id,
                resource_class_id,
                total,
                reserved: 0,
                min_unit: 1,
                max_unit: total,
                step_size: 1,
                allocation_ratio,
            },
        );
    }

    pub fn add_used(&self, provider: &ResourceProvider, resource_class_id: ResourceClassId, used: u32) {
        self.state
            .lock()
            .unwrap()
            .used
            .insert((provider.id, resource_class_id), used);
    }

    pub fn add_trait(&self, provider: &ResourceProvider, trait_id: TraitId) {
        self.state
            .lock()
            .unwrap()
            .traits
            .entry(provider.id)
            .or_default()
            .insert(trait_id);
    }

    pub fn add_aggregate(&self, provider: &ResourceProvider, aggregate_id: AggregateId) {
        self.state
            .lock()
            .unwrap()
            .aggregates
            .entry(provider.id)
            .or_default()
            .insert(aggregate_id);
    }

    fn node_for(state: &State, provider: &ResourceProvider) -> ProviderTreeNode {
        let inventories = state
            .inventories
            .iter()
            .filter(|((pid, _), _)| *pid == provider.id)
            .map(|(_, inv)| *inv)
            .collect();
        let used = state
            .used
            .iter()
            .filter(|((pid, _), _)| *pid == provider.id)
            .map(|((_, class_id), amount)| (*class_id, *amount))
            .collect();
        ProviderTreeNode {
            provider: provider.clone(),
            inventories,
            used,
            trait_ids: state.traits.get(&provider.id).cloned().unwrap_or_default(),
            aggregate_ids: state.aggregates.get(&provider.id).cloned().unwrap_or_default(),
        }
    }

    fn satisfiable(state: &State, provider_id: ProviderId, class_id: ResourceClassId, amount: u32) -> bool {
        let Some(inv) = state.inventories.get(&(provider_id, class_id)) else {
            return false;
        };
        let used = state
            .used
            .get(&(provider_id, class_id))
            .copied()
            .unwrap_or(0);
        placement_domain::inventory::is_satisfiable(inv, used, amount)
    }
}

#[async_trait]
impl ProviderGraphStore for FakeGraphStore {
    async fn list_providers_matching(
        &self,
        _ctx: &RequestContext,
        resources: &[(ResourceClassId, u32)],
        required_trait_ids: &[TraitId],
        forbidden_trait_ids: &[TraitId],
        member_of: &[HashSet<AggregateId>],
    ) -> Result<Vec<(ProviderId, ProviderId)>> {
        let state = self.state.lock().unwrap();
        let sharing_trait = TraitId::Standard(0);
        let mut out = Vec::new();
        for provider in &state.providers {
            let traits = state.traits.get(&provider.id).cloned().unwrap_or_default();
            if traits.contains(&sharing_trait) {
                continue;
            }
            if !resources
                .iter()
                .all(|(class_id, amount)| Self::satisfiable(&state, provider.id, *class_id, *amount))
            {
                continue;
            }
            if !required_trait_ids.iter().all(|t| traits.contains(t)) {
                continue;
            }
            if forbidden_trait_ids.iter().any(|t| traits.contains(t)) {
                continue;
            }
            let aggregates = state.aggregates.get(&provider.id).cloned().unwrap_or_default();
            if !member_of.iter().all(|inner| !inner.is_disjoint(&aggregates)) {
                continue;
            }
            out.push((provider.id, provider.root_id_or_self()));
        }
        Ok(out)
    }

    async fn list_providers_with_any_trait(
        &self,
        _ctx: &RequestContext,
        trait_ids: &[TraitId],
    ) -> Result<Vec<ProviderId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .providers
            .iter()
            .filter(|p| {
                state
                    .traits
                    .get(&p.id)
                    .is_some_and(|t| trait_ids.iter().any(|id| t.contains(id)))
            })
            .map(|p| p.id)
            .collect())
    }

    async fn list_providers_having_all_traits(
        &self,
        _ctx: &RequestContext,
        trait_ids: &[TraitId],
    ) -> Result<Vec<ProviderId>> {
        use placement_domain::error::Error;
        if trait_ids.is_empty() {
            return Err(Error::bad_request("trait_ids must not be empty"));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .providers
            .iter()
            .filter(|p| {
                state
                    .traits
                    .get(&p.id)
                    .is_some_and(|t| trait_ids.iter().all(|id| t.contains(id)))
            })
            .map(|p| p.id)
            .collect())
    }

    async fn get_tree_providers(
        &self,
        _ctx: &RequestContext,
        root_ids: &[ProviderId],
    ) -> Result<Vec<ProviderTreeNode>> {
        let state = self.state.lock().unwrap();
        let roots: HashSet<ProviderId> = root_ids.iter().copied().collect();
        Ok(state
            .providers
            .iter()
            .filter(|p| roots.contains(&p.root_id_or_self()) || roots.contains(&p.id))
            .map(|p| Self::node_for(&state, p))
            .collect())
    }

    async fn get_sharing_providers(
        &self,
        _ctx: &RequestContext,
        resource_class_id: ResourceClassId,
    ) -> Result<Vec<(ProviderId, AggregateId)>> {
        let state = self.state.lock().unwrap();
        let sharing_trait = TraitId::Standard(0);
        let mut out = Vec::new();
        for provider in &state.providers {
            let traits = state.traits.get(&provider.id).cloned().unwrap_or_default();
            if !traits.contains(&sharing_trait) {
                continue;
            }
            if !state.inventories.contains_key(&(provider.id, resource_class_id)) {
                continue;
            }
            for aggregate_id in state.aggregates.get(&provider.id).cloned().unwrap_or_default() {
                out.push((provider.id, aggregate_id));
            }
        }
        Ok(out)
    }

    async fn trees_with_traits(
        &self,
        _ctx: &RequestContext,
        candidate_provider_ids: &[ProviderId],
        required: &[TraitId],
        forbidden: &[TraitId],
    ) -> Result<Vec<(ProviderId, ProviderId)>> {
        let state = self.state.lock().unwrap();
        let mut out = Vec::new();
        for provider_id in candidate_provider_ids {
            let Some(provider) = state.providers.iter().find(|p| p.id == *provider_id) else {
                continue;
            };
            let root = provider.root_id_or_self();
            let union: HashSet<TraitId> = state
                .providers
                .iter()
                .filter(|p| p.root_id_or_self() == root)
                .flat_map(|p| state.traits.get(&p.id).cloned().unwrap_or_default())
                .collect();
            if required.iter().all(|t| union.contains(t)) && forbidden.iter().all(|t| !union.contains(t)) {
                out.push((*provider_id, root));
            }
        }
        Ok(out)
    }

    async fn create_provider(
        &self,
        _ctx: &RequestContext,
        name: &str,
        parent_id: Option<ProviderId>,
    ) -> Result<ResourceProvider> {
        Ok(self.add_provider(name, parent_id))
    }

    async fn update_provider(
        &self,
        _ctx: &RequestContext,
        provider: &ResourceProvider,
        _observed_generation: u32,
    ) -> Result<ResourceProvider> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.providers.iter_mut().find(|p| p.id == provider.id) {
            existing.name = provider.name.clone();
            existing.parent_id = provider.parent_id;
            existing.generation += 1;
            return Ok(existing.clone());
        }
        Err(placement_domain::error::Error::internal("unknown provider"))
    }

    async fn destroy_provider(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        _observed_generation: u32,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.providers.retain(|p| p.id != provider_id);
        Ok(())
    }

    async fn set_aggregates(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        aggregate_ids: HashSet<AggregateId>,
        _observed_generation: u32,
    ) -> Result<u32> {
        let mut state = self.state.lock().unwrap();
        state.aggregates.insert(provider_id, aggregate_ids);
        let provider = state
            .providers
            .iter_mut()
            .find(|p| p.id == provider_id)
            .ok_or_else(|| placement_domain::error::Error::internal("unknown provider"))?;
        provider.generation += 1;
        Ok(provider.generation)
    }

    async fn set_traits(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        trait_ids: HashSet<TraitId>,
        _observed_generation: u32,
    ) -> Result<u32> {
        let mut state = self.state.lock().unwrap();
        state.traits.insert(provider_id, trait_ids);
        let provider = state
            .providers
            .iter_mut()
            .find(|p| p.id == provider_id)
            .ok_or_else(|| placement_domain::error::Error::internal("unknown provider"))?;
        provider.generation += 1;
        Ok(provider.generation)
    }

    async fn add_inventory(
        &self,
        _ctx: &RequestContext,
        record: InventoryRecord,
        _observed_generation: u32,
    ) -> Result<u32> {
        let mut state = self.state.lock().unwrap();
        state
            .inventories
            .insert((record.provider_id, record.resource_class_id), record);
        let provider = state
            .providers
            .iter_mut()
            .find(|p| p.id == record.provider_id)
            .ok_or_else(|| placement_domain::error::Error::internal("unknown provider"))?;
        provider.generation += 1;
        Ok(provider.generation)
    }

    async fn record_allocation(
        &self,
        _ctx: &RequestContext,
        allocation: Allocation,
        _observed_generation: u32,
    ) -> Result<u32> {
        let mut state = self.state.lock().unwrap();
        *state
            .used
            .entry((allocation.provider_id, allocation.resource_class_id))
            .or_insert(0) += allocation.used;
        let provider = state
            .providers
            .iter_mut()
            .find(|p| p.id == allocation.provider_id)
            .ok_or_else(|| placement_domain::error::Error::internal("unknown provider"))?;
        provider.generation += 1;
        Ok(provider.generation)
    }
}
