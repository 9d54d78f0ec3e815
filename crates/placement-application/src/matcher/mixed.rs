//! Mixed path (spec §4.5.3): resources may be drawn from a non-sharing
//! root provider (the *anchor*), any provider in the anchor's tree, and
//! any sharing provider reachable from the tree via a common aggregate.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use itertools::Itertools;

use placement_domain::entities::{AggregateId, ProviderId, ResourceClassId};
use placement_domain::error::Result;
use placement_domain::inventory::is_satisfiable;
use placement_domain::ports::{ProviderGraphStore, ProviderTreeNode, RequestContext};
use placement_domain::registry::ResourceClassRegistry;
use placement_domain::value_objects::{AllocationRequest, AllocationRequestEntry};

use crate::matcher::GroupMatchResult;
use crate::resolved::ResolvedRequestGroup;

/// A single source of supply for one requested resource class within one
/// anchor's candidate: either a member of the anchor's own tree, or a
/// sharing provider reached via an aggregate the tree participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Source {
    Tree(ProviderId),
    Sharing(ProviderId),
}

impl Source {
    fn provider_id(self) -> ProviderId {
        match self {
            Self::Tree(id) | Self::Sharing(id) => id,
        }
    }
}

pub async fn match_group(
    group: &ResolvedRequestGroup,
    store: &Arc<dyn ProviderGraphStore>,
    ctx: &RequestContext,
    resource_classes: &Arc<ResourceClassRegistry>,
) -> Result<GroupMatchResult> {
    let mut result = GroupMatchResult::default();

    // Step 1: anchors, plus the raw (provider, aggregate) sharing pairs
    // per requested class that step 2 will need again.
    let mut anchor_roots: HashSet<ProviderId> = HashSet::new();
    let mut sharing_pairs: HashMap<ResourceClassId, Vec<(ProviderId, AggregateId)>> = HashMap::new();
    let mut all_sharing_ids: HashSet<ProviderId> = HashSet::new();

    for (class_id, amount) in &group.resources {
        let local = store
            .list_providers_matching(ctx, &[(*class_id, *amount)], &[], &[], &[])
            .await?;
        anchor_roots.extend(local.into_iter().map(|(_, root)| root));

        let sharing = store.get_sharing_providers(ctx, *class_id).await?;
        let aggregates: HashSet<AggregateId> = sharing.iter().map(|(_, agg)| *agg).collect();
        for aggregate_id in &aggregates {
            let reachable = store
                .list_providers_matching(
                    ctx,
                    &[],
                    &[],
                    &[],
                    std::slice::from_ref(&HashSet::from([*aggregate_id])),
                )
                .await?;
            anchor_roots.extend(reachable.into_iter().map(|(_, root)| root));
        }
        anchor_roots.extend(sharing.iter().map(|(id, _)| *id));
        all_sharing_ids.extend(sharing.iter().map(|(id, _)| *id));
        sharing_pairs.insert(*class_id, sharing);
    }

    if anchor_roots.is_empty() {
        return Ok(result);
    }

    let mut anchor_root_ids: Vec<ProviderId> = anchor_roots.into_iter().collect();
    anchor_root_ids.sort();
    let tree_nodes = store.get_tree_providers(ctx, &anchor_root_ids).await?;
    // A `BTreeMap` keeps anchor iteration below in provider-id order, per
    // spec §5's deterministic-enumeration requirement, without needing a
    // second sort pass.
    let mut nodes_by_root: BTreeMap<ProviderId, Vec<&ProviderTreeNode>> = BTreeMap::new();
    for node in &tree_nodes {
        nodes_by_root
            .entry(node.provider.root_id_or_self())
            .or_default()
            .push(node);
    }

    let sharing_ids: Vec<ProviderId> = all_sharing_ids.into_iter().collect();
    let sharing_nodes = store.get_tree_providers(ctx, &sharing_ids).await?;
    let sharing_by_id: HashMap<ProviderId, &ProviderTreeNode> = sharing_nodes
        .iter()
        .map(|node| (node.provider.id, node))
        .collect();

    let mut class_names = Vec::with_capacity(group.resources.len());
    for (class_id, _) in &group.resources {
        class_names.push((*class_id, resource_classes.name_from_id(*class_id).await?));
    }

    for members in nodes_by_root.values() {
        let tree_aggregate_ids: HashSet<AggregateId> = members
            .iter()
            .flat_map(|m| m.aggregate_ids.iter().copied())
            .collect();

        if !member_of_satisfied(&tree_aggregate_ids, &group.member_of) {
            continue;
        }

        // Step 2: resource-source partition, one list per requested class.
        let mut source_lists: Vec<Vec<Source>> = Vec::with_capacity(group.resources.len());
        let mut feasible = true;
        for (class_id, amount) in &group.resources {
            let mut sources = Vec::new();
            let mut seen = HashSet::new();

            for member in members {
                if let Some(inv) = member.inventory_of(*class_id) {
                    if is_satisfiable(inv, member.used_of(*class_id), *amount)
                        && seen.insert(Source::Tree(member.provider.id))
                    {
                        sources.push(Source::Tree(member.provider.id));
                    }
                }
            }

            if let Some(pairs) = sharing_pairs.get(class_id) {
                for (sharing_id, aggregate_id) in pairs {
                    if !tree_aggregate_ids.contains(aggregate_id) {
                        continue;
                    }
                    let Some(node) = sharing_by_id.get(sharing_id) else {
                        continue;
                    };
                    if let Some(inv) = node.inventory_of(*class_id) {
                        if is_satisfiable(inv, node.used_of(*class_id), *amount)
                            && seen.insert(Source::Sharing(*sharing_id))
                        {
                            sources.push(Source::Sharing(*sharing_id));
                        }
                    }
                }
            }

            if sources.is_empty() {
                feasible = false;
                break;
            }
            source_lists.push(sources);
        }
        if !feasible {
            continue;
        }

        // Step 3: Cartesian product across classes.
        for combo in source_lists.into_iter().multi_cartesian_product() {
            // Step 4: trait filtering over the providers actually supplying
            // a resource in this candidate — not the anchor merely
            // organizing the tree, per spec §4.5.4.
            let referenced: HashSet<ProviderId> =
                combo.iter().map(|source| source.provider_id()).collect();
            let mut trait_union = HashSet::new();
            let mut node_by_provider: HashMap<ProviderId, &ProviderTreeNode> = HashMap::new();
            for provider_id in &referenced {
                let node = members
                    .iter()
                    .find(|m| m.provider.id == *provider_id)
                    .copied()
                    .or_else(|| sharing_by_id.get(provider_id).copied());
                if let Some(node) = node {
                    trait_union.extend(node.trait_ids.iter().copied());
                    node_by_provider.insert(*provider_id, node);
                }
            }
            if !group.required_trait_ids.is_subset(&trait_union) {
                continue;
            }
            if !group.forbidden_trait_ids.is_disjoint(&trait_union) {
                continue;
            }

            let mut entries = Vec::with_capacity(combo.len());
            let mut valid = true;
            for (i, source) in combo.iter().enumerate() {
                let (_, name) = &class_names[i];
                let (_, amount) = group.resources[i];
                let Some(node) = node_by_provider.get(&source.provider_id()) else {
                    valid = false;
                    break;
                };
                entries.push(AllocationRequestEntry {
                    provider_uuid: node.provider.uuid,
                    resource_class: name.clone(),
                    amount,
                });
            }
            if !valid {
                continue;
            }

            for node in node_by_provider.values() {
                result.providers.insert(node.provider.uuid, (*node).clone());
            }
            result.candidates.push(AllocationRequest::new(entries));
        }
    }

    Ok(result)
}

/// `true` iff `aggregate_ids` intersects every inner set of `member_of`
/// (AND of ORs). An empty `member_of` is trivially satisfied.
fn member_of_satisfied(aggregate_ids: &HashSet<AggregateId>, member_of: &[HashSet<AggregateId>]) -> bool {
    member_of
        .iter()
        .all(|inner| !inner.is_disjoint(aggregate_ids))
}
