//! The allocation candidate engine: the single entry point wiring the
//! matcher and assembler together over a request group mapping (spec
//! §4.5/§4.6).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::instrument;
use uuid::Uuid;

use placement_domain::error::{Error, Result};
use placement_domain::ports::{ProviderGraphStore, ProviderTreeNode, RequestContext};
use placement_domain::registry::{ResourceClassRegistry, TraitRegistry};
use placement_domain::value_objects::{AllocationRequest, ProviderSummary, RequestGroups, UNSUFFIXED_GROUP_KEY};

use crate::assembler::assemble;
use crate::config::MatcherConfig;
use crate::matcher::{mixed, single_provider, GroupMatchResult};
use crate::resolved::resolve;

/// Wires the provider graph store and the two registries behind the
/// matcher and assembler; the only public surface applications call.
pub struct AllocationCandidateEngine {
    store: Arc<dyn ProviderGraphStore>,
    resource_classes: Arc<ResourceClassRegistry>,
    traits: Arc<TraitRegistry>,
    config: MatcherConfig,
}

impl AllocationCandidateEngine {
    /// Build an engine over the given storage backend and registries.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProviderGraphStore>,
        resource_classes: Arc<ResourceClassRegistry>,
        traits: Arc<TraitRegistry>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            store,
            resource_classes,
            traits,
            config,
        }
    }

    /// Compute allocation candidates for `request_groups`, returning the
    /// deduplicated, ordered allocation requests together with summaries
    /// of every provider they reference.
    ///
    /// `limit`, if supplied, overrides [`MatcherConfig::default_candidate_limit`]
    /// for this call only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if `request_groups` is empty or any
    /// group is malformed; [`Error::ResourceClassNotFound`] /
    /// [`Error::TraitNotFound`] if a name fails to resolve; and whatever
    /// [`Error::Storage`] or [`Error::DeadlineExceeded`] the backing store
    /// surfaces.
    #[instrument(skip_all, fields(groups = request_groups.len()))]
    pub async fn allocation_candidates(
        &self,
        request_groups: &RequestGroups,
        ctx: &RequestContext,
        limit: Option<usize>,
    ) -> Result<(Vec<AllocationRequest>, Vec<ProviderSummary>)> {
        if request_groups.is_empty() {
            return Err(Error::bad_request(
                "at least one request group is required",
            ));
        }

        let mut per_group_candidates: Vec<Vec<AllocationRequest>> =
            Vec::with_capacity(request_groups.len());
        let mut providers: HashMap<Uuid, ProviderTreeNode> = HashMap::new();

        for (key, group) in request_groups {
            if ctx.is_expired() {
                return Err(Error::DeadlineExceeded);
            }

            let resolved = resolve(group, &self.resource_classes, &self.traits).await?;
            // Granular (keyed) groups carry use_same_provider=true
            // semantics regardless of what the caller set (spec §4.5).
            let forced_single = key.as_str() != UNSUFFIXED_GROUP_KEY;

            let GroupMatchResult {
                candidates,
                providers: touched,
            } = if resolved.use_same_provider || forced_single {
                single_provider::match_group(&resolved, &self.store, ctx, &self.resource_classes)
                    .await?
            } else {
                mixed::match_group(&resolved, &self.store, ctx, &self.resource_classes).await?
            };

            if candidates.is_empty() {
                tracing::debug!(group = %key, "request group admits no candidates");
                return Ok((Vec::new(), Vec::new()));
            }

            providers.extend(touched);
            per_group_candidates.push(candidates);
        }

        let mut combined = combine_groups(per_group_candidates);

        let mut seen = HashSet::with_capacity(combined.len());
        combined.retain(|candidate| seen.insert(candidate.dedup_key()));

        if self.config.randomize_allocation_candidates {
            combined.shuffle(&mut rand::rng());
        }

        if let Some(limit) = limit.or(self.config.default_candidate_limit) {
            combined.truncate(limit);
        }

        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }

        let summaries = assemble(&combined, &providers, &self.resource_classes, &self.traits).await?;
        Ok((combined, summaries))
    }
}

/// Cartesian-combine each group's independent candidates into full
/// requests that satisfy every group at once, dropping any combination
/// where two groups would place the same resource class name into one
/// request (spec §4.5.4 invariant: a class appears at most once).
fn combine_groups(mut groups: Vec<Vec<AllocationRequest>>) -> Vec<AllocationRequest> {
    let Some(mut acc) = (!groups.is_empty()).then(|| groups.remove(0)) else {
        return Vec::new();
    };
    for next in groups {
        let mut merged = Vec::with_capacity(acc.len() * next.len());
        for a in &acc {
            for b in &next {
                if let Some(candidate) = merge_candidates(a, b) {
                    merged.push(candidate);
                }
            }
        }
        acc = merged;
    }
    acc
}

fn merge_candidates(a: &AllocationRequest, b: &AllocationRequest) -> Option<AllocationRequest> {
    let a_classes: HashSet<&str> = a.entries.iter().map(|e| e.resource_class.as_str()).collect();
    if b.entries.iter().any(|e| a_classes.contains(e.resource_class.as_str())) {
        return None;
    }
    let mut entries = a.entries.clone();
    entries.extend(b.entries.iter().cloned());
    Some(AllocationRequest::new(entries))
}
