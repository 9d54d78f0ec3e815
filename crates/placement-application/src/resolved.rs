//! Resolves a caller-facing [`RequestGroup`] into ids via the registries
//! (spec §4.5.1), failing fast on any unknown name before any storage read
//! beyond the registries' own caches.

use std::collections::HashSet;
use std::sync::Arc;

use placement_domain::entities::{AggregateId, ResourceClassId, TraitId};
use placement_domain::error::{Error, Result};
use placement_domain::registry::{ResourceClassRegistry, TraitRegistry};
use placement_domain::value_objects::RequestGroup;

/// A [`RequestGroup`] with every name resolved to its compact id.
#[derive(Debug, Clone)]
pub struct ResolvedRequestGroup {
    /// `(resource_class_id, amount)` pairs, in the order resolved.
    pub resources: Vec<(ResourceClassId, u32)>,
    /// Traits every provider referenced by a candidate must collectively
    /// bear.
    pub required_trait_ids: HashSet<TraitId>,
    /// Traits no provider referenced by a candidate may bear.
    pub forbidden_trait_ids: HashSet<TraitId>,
    /// AND of ORs over aggregate membership.
    pub member_of: Vec<HashSet<AggregateId>>,
    /// Whether every resource in this group must come from one provider.
    pub use_same_provider: bool,
}

/// Resolve `group`'s names to ids.
///
/// # Errors
///
/// Returns [`Error::BadRequest`] if any requested amount is zero, or
/// [`Error::ResourceClassNotFound`] / [`Error::TraitNotFound`] for the
/// first unresolvable name encountered, in that order, before any
/// provider-graph read.
pub async fn resolve(
    group: &RequestGroup,
    resource_classes: &Arc<ResourceClassRegistry>,
    traits: &Arc<TraitRegistry>,
) -> Result<ResolvedRequestGroup> {
    if group.resources.is_empty() {
        return Err(Error::bad_request(
            "request group must ask for at least one resource class",
        ));
    }

    let mut resources = Vec::with_capacity(group.resources.len());
    for (name, amount) in &group.resources {
        if *amount == 0 {
            return Err(Error::bad_request(format!(
                "requested amount for {name} must be at least 1"
            )));
        }
        resources.push((resource_classes.id_from_name(name).await?, *amount));
    }

    let mut required_trait_ids = HashSet::with_capacity(group.required_traits.len());
    for name in &group.required_traits {
        required_trait_ids.insert(traits.id_from_name(name).await?);
    }

    let mut forbidden_trait_ids = HashSet::with_capacity(group.forbidden_traits.len());
    for name in &group.forbidden_traits {
        forbidden_trait_ids.insert(traits.id_from_name(name).await?);
    }

    let overlap = required_trait_ids
        .intersection(&forbidden_trait_ids)
        .next()
        .is_some();
    if overlap {
        return Err(Error::bad_request(
            "a trait cannot be both required and forbidden in the same request group",
        ));
    }

    Ok(ResolvedRequestGroup {
        resources,
        required_trait_ids,
        forbidden_trait_ids,
        member_of: group.member_of.clone(),
        use_same_provider: group.use_same_provider,
    })
}
