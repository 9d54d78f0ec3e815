//! Single-provider path (spec §4.5.2): every resource in the group must
//! come from one provider.

use std::collections::HashSet;
use std::sync::Arc;

use placement_domain::entities::{ProviderId, TraitId};
use placement_domain::error::Result;
use placement_domain::inventory::is_satisfiable;
use placement_domain::ports::{ProviderGraphStore, RequestContext};
use placement_domain::registry::ResourceClassRegistry;
use placement_domain::value_objects::{AllocationRequest, AllocationRequestEntry};

use crate::matcher::GroupMatchResult;
use crate::resolved::ResolvedRequestGroup;

/// Narrow the candidate set to providers whose own inventory satisfies
/// every requested `(class, amount)` pair and the group's trait and
/// `member_of` constraints, then emit one candidate per survivor.
///
/// `list_providers_matching` narrows on traits, `member_of` and class
/// satisfiability (spec §4.3), but its satisfiability check also counts
/// classes reachable through a sharing provider in the same aggregate —
/// correct for the mixed path, wrong here. Spec §4.5.2 requires every
/// resource in a single-provider group to come from that one provider's
/// *own* inventory, so each survivor is re-checked against its own
/// inventory records before a candidate is emitted for it.
pub async fn match_group(
    group: &ResolvedRequestGroup,
    store: &Arc<dyn ProviderGraphStore>,
    ctx: &RequestContext,
    resource_classes: &Arc<ResourceClassRegistry>,
) -> Result<GroupMatchResult> {
    let required: Vec<TraitId> = group.required_trait_ids.iter().copied().collect();
    let forbidden: Vec<TraitId> = group.forbidden_trait_ids.iter().copied().collect();

    let matches = store
        .list_providers_matching(ctx, &group.resources, &required, &forbidden, &group.member_of)
        .await?;
    if matches.is_empty() {
        return Ok(GroupMatchResult::default());
    }

    let root_ids: Vec<ProviderId> = matches
        .iter()
        .map(|(_, root)| *root)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let nodes = store.get_tree_providers(ctx, &root_ids).await?;

    let mut class_names = Vec::with_capacity(group.resources.len());
    for (class_id, amount) in &group.resources {
        class_names.push((*class_id, resource_classes.name_from_id(*class_id).await?, *amount));
    }

    let mut result = GroupMatchResult::default();
    for (provider_id, _root_id) in matches {
        let Some(node) = nodes.iter().find(|n| n.provider.id == provider_id) else {
            continue;
        };
        let satisfies_own_inventory = class_names.iter().all(|(class_id, _, amount)| {
            node.inventory_of(*class_id)
                .is_some_and(|inventory| is_satisfiable(inventory, node.used_of(*class_id), *amount))
        });
        if !satisfies_own_inventory {
            continue;
        }
        let entries = class_names
            .iter()
            .map(|(_, name, amount)| AllocationRequestEntry {
                provider_uuid: node.provider.uuid,
                resource_class: name.clone(),
                amount: *amount,
            })
            .collect();
        result.providers.insert(node.provider.uuid, node.clone());
        result.candidates.push(AllocationRequest::new(entries));
    }
    Ok(result)
}
