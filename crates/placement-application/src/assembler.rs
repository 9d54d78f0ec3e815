//! The Candidate Assembler (spec §4.6): turns the matcher's retained
//! candidates and the provider data it touched into the final provider
//! summaries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use placement_domain::error::Result;
use placement_domain::inventory::effective_capacity;
use placement_domain::ports::ProviderTreeNode;
use placement_domain::registry::{ResourceClassRegistry, TraitRegistry};
use placement_domain::value_objects::{AllocationRequest, ProviderResourceSummary, ProviderSummary};

/// Build one [`ProviderSummary`] per distinct provider referenced by
/// `candidates`, covering every inventory that provider carries (not only
/// the requested classes) and its complete trait-name set.
///
/// # Errors
///
/// Returns an error if a referenced provider's resource-class or trait ids
/// fail to resolve to names.
pub async fn assemble(
    candidates: &[AllocationRequest],
    providers: &HashMap<Uuid, ProviderTreeNode>,
    resource_classes: &Arc<ResourceClassRegistry>,
    traits: &Arc<TraitRegistry>,
) -> Result<Vec<ProviderSummary>> {
    let mut referenced: HashSet<Uuid> = HashSet::new();
    for candidate in candidates {
        referenced.extend(candidate.provider_uuids());
    }

    let mut summaries = Vec::with_capacity(referenced.len());
    for provider_uuid in referenced {
        let Some(node) = providers.get(&provider_uuid) else {
            continue;
        };

        let mut resources = Vec::with_capacity(node.inventories.len());
        for inventory in &node.inventories {
            resources.push(ProviderResourceSummary {
                resource_class: resource_classes.name_from_id(inventory.resource_class_id).await?,
                capacity: effective_capacity(inventory),
                used: node.used_of(inventory.resource_class_id),
            });
        }

        let mut trait_names = Vec::with_capacity(node.trait_ids.len());
        for trait_id in &node.trait_ids {
            trait_names.push(traits.name_from_id(*trait_id).await?);
        }
        trait_names.sort();

        summaries.push(ProviderSummary {
            provider_uuid,
            resources,
            traits: trait_names,
        });
    }

    summaries.sort_by_key(|summary| summary.provider_uuid);
    Ok(summaries)
}
