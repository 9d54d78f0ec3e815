//! Cross-cutting invariants from spec §8 that must hold for every
//! candidate the engine returns, regardless of which matching path
//! produced it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use placement_application::config::MatcherConfig;
use placement_application::engine::AllocationCandidateEngine;
use placement_domain::entities::AggregateId;
use placement_domain::entities::ResourceClassId;
use placement_domain::ports::RequestContext;
use placement_domain::registry::{ResourceClassRegistry, TraitRegistry};
use placement_domain::value_objects::{AllocationRequest, ProviderSummary, RequestGroup, RequestGroups, UNSUFFIXED_GROUP_KEY};

use crate::scenarios::fixture::{EmptyCatalogStore, FakeGraphStore};

fn engine(store: Arc<FakeGraphStore>) -> AllocationCandidateEngine {
    let catalog = Arc::new(EmptyCatalogStore);
    AllocationCandidateEngine::new(
        store,
        Arc::new(ResourceClassRegistry::new(catalog.clone())),
        Arc::new(TraitRegistry::new(catalog)),
        MatcherConfig::default(),
    )
}

fn group(resources: &[(&str, u32)]) -> RequestGroups {
    let mut map = BTreeMap::new();
    for (name, amount) in resources {
        map.insert((*name).to_owned(), *amount);
    }
    let mut groups = RequestGroups::new();
    groups.insert(UNSUFFIXED_GROUP_KEY.to_owned(), RequestGroup::new(map));
    groups
}

/// Every candidate names each requested resource class exactly once, and
/// the amounts drawn for a class sum to the requested amount (spec §8,
/// invariant 1 and 2).
fn assert_amounts_conserved(candidate: &AllocationRequest, requested: &[(&str, u32)]) {
    for (class, amount) in requested {
        let entries: Vec<_> = candidate
            .entries
            .iter()
            .filter(|e| e.resource_class == *class)
            .collect();
        assert!(
            !entries.is_empty(),
            "candidate is missing an entry for {class}: {candidate:?}"
        );
        let sum: u32 = entries.iter().map(|e| e.amount).sum();
        assert_eq!(sum, *amount, "amounts for {class} don't sum to the request");
    }
    assert_eq!(
        candidate.entries.len(),
        requested.len(),
        "candidate has extra entries beyond what was requested: {candidate:?}"
    );
}

/// Every provider referenced by at least one retained candidate has
/// exactly one summary, and no summary is orphaned (spec §8, invariant
/// on summary completeness/uniqueness).
fn assert_summaries_match_candidates(candidates: &[AllocationRequest], summaries: &[ProviderSummary]) {
    let referenced: HashSet<_> = candidates
        .iter()
        .flat_map(AllocationRequest::provider_uuids)
        .collect();
    let summarized: HashSet<_> = summaries.iter().map(|s| s.provider_uuid).collect();
    assert_eq!(referenced, summarized, "summaries don't match referenced providers");
    assert_eq!(
        summaries.len(),
        summarized.len(),
        "a provider has more than one summary"
    );
}

#[tokio::test]
async fn single_provider_candidates_conserve_amounts_and_have_complete_summaries() {
    let store = Arc::new(FakeGraphStore::new());
    let compute = store.add_root("compute");
    store.add_inventory(&compute, ResourceClassId::Standard(0), 64, 1.0);
    store.add_inventory(&compute, ResourceClassId::Standard(1), 65536, 1.0);

    let requested = [("VCPU", 8), ("MEMORY_MB", 8192)];
    let mut groups = group(&requested);
    groups.get_mut(UNSUFFIXED_GROUP_KEY).unwrap().use_same_provider = true;

    let (candidates, summaries) = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_amounts_conserved(&candidates[0], &requested);
    assert_summaries_match_candidates(&candidates, &summaries);
}

#[tokio::test]
async fn single_provider_path_rejects_a_provider_that_only_shares_a_class_via_aggregate() {
    // `P` has VCPU inventory only; `S` shares DISK_GB via the same
    // aggregate. A granular `use_same_provider=true` request for both
    // classes must not name `P` for DISK_GB, since `P` has no DISK_GB
    // inventory of its own (spec §4.5.2, §8 invariant 3).
    let store = Arc::new(FakeGraphStore::new());
    let agg = AggregateId(1);

    let provider = store.add_root("compute-only");
    store.add_inventory(&provider, ResourceClassId::Standard(0), 64, 1.0);
    store.add_aggregate(&provider, agg);

    let sharing = store.add_root("shared-storage");
    store.add_inventory(&sharing, ResourceClassId::Standard(2), 4000, 1.0);
    store.add_trait(&sharing, placement_domain::entities::TraitId::Standard(0));
    store.add_aggregate(&sharing, agg);

    let requested = [("VCPU", 8), ("DISK_GB", 100)];
    let mut groups = group(&requested);
    groups.get_mut(UNSUFFIXED_GROUP_KEY).unwrap().use_same_provider = true;

    let (candidates, summaries) = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap();

    assert!(
        candidates.is_empty(),
        "no single provider owns both classes, so no candidate should be emitted: {candidates:?}"
    );
    assert!(summaries.is_empty());
}

#[tokio::test]
async fn mixed_path_candidates_conserve_amounts_and_have_complete_summaries() {
    let store = Arc::new(FakeGraphStore::new());
    let agg = AggregateId(1);

    let compute = store.add_root("compute");
    store.add_inventory(&compute, ResourceClassId::Standard(0), 64, 1.0);
    store.add_aggregate(&compute, agg);

    let disk = store.add_child("disk", &compute);
    store.add_inventory(&disk, ResourceClassId::Standard(2), 2000, 1.0);

    let shared_storage = store.add_root("shared-storage");
    store.add_inventory(&shared_storage, ResourceClassId::Standard(2), 4000, 1.0);
    store.add_trait(&shared_storage, placement_domain::entities::TraitId::Standard(0));
    store.add_aggregate(&shared_storage, agg);

    let requested = [("VCPU", 8), ("DISK_GB", 100)];
    let groups = group(&requested);

    let (candidates, summaries) = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap();

    // DISK_GB can come from either `disk` (tree member) or `shared_storage`
    // (sharing provider), so two candidates are expected; both must
    // individually conserve amounts, and the summaries must cover every
    // provider referenced across both.
    assert_eq!(candidates.len(), 2);
    for candidate in &candidates {
        assert_amounts_conserved(candidate, &requested);
    }
    assert_summaries_match_candidates(&candidates, &summaries);
}

#[tokio::test]
async fn dedup_key_is_insensitive_to_entry_order() {
    // `dedup_key` must treat a candidate as equal to itself regardless of
    // the order its entries were pushed in, since the cartesian combine
    // in `combine_groups` can produce the same set of (provider, class,
    // amount) triples via different group orderings (spec §4.5.4).
    use placement_domain::value_objects::AllocationRequestEntry;

    let uuid_a = uuid::Uuid::new_v4();
    let uuid_b = uuid::Uuid::new_v4();
    let forward = AllocationRequest::new(vec![
        AllocationRequestEntry {
            provider_uuid: uuid_a,
            resource_class: "VCPU".to_owned(),
            amount: 8,
        },
        AllocationRequestEntry {
            provider_uuid: uuid_b,
            resource_class: "DISK_GB".to_owned(),
            amount: 100,
        },
    ]);
    let reversed = AllocationRequest::new(vec![
        AllocationRequestEntry {
            provider_uuid: uuid_b,
            resource_class: "DISK_GB".to_owned(),
            amount: 100,
        },
        AllocationRequestEntry {
            provider_uuid: uuid_a,
            resource_class: "VCPU".to_owned(),
            amount: 8,
        },
    ]);

    assert_eq!(forward.dedup_key(), reversed.dedup_key());
}

#[tokio::test]
async fn engine_never_returns_duplicate_candidates() {
    let store = Arc::new(FakeGraphStore::new());
    let agg = AggregateId(1);

    let compute = store.add_root("compute");
    store.add_inventory(&compute, ResourceClassId::Standard(0), 64, 1.0);
    store.add_aggregate(&compute, agg);

    let disk = store.add_child("disk", &compute);
    store.add_inventory(&disk, ResourceClassId::Standard(2), 2000, 1.0);

    let shared_storage = store.add_root("shared-storage");
    store.add_inventory(&shared_storage, ResourceClassId::Standard(2), 4000, 1.0);
    store.add_trait(&shared_storage, placement_domain::entities::TraitId::Standard(0));
    store.add_aggregate(&shared_storage, agg);

    let groups = group(&[("VCPU", 8), ("DISK_GB", 100)]);

    let (candidates, _) = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap();

    let mut keys: Vec<_> = candidates.iter().map(AllocationRequest::dedup_key).collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), before, "engine returned duplicate candidates");
}
