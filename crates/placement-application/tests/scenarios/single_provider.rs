use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use placement_application::engine::AllocationCandidateEngine;
use placement_application::config::MatcherConfig;
use placement_domain::entities::{ResourceClassId, TraitId};
use placement_domain::ports::RequestContext;
use placement_domain::registry::{ResourceClassRegistry, TraitRegistry};
use placement_domain::value_objects::{RequestGroup, RequestGroups, UNSUFFIXED_GROUP_KEY};

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

fn single_group(resources: &[(&str, u32)]) -> RequestGroups {
    let mut map = BTreeMap::new();
    for (name, amount) in resources {
        map.insert((*name).to_owned(), *amount);
    }
    let mut groups = RequestGroups::new();
    groups.insert(
        UNSUFFIXED_GROUP_KEY.to_owned(),
        RequestGroup::new(map).with_use_same_provider(true),
    );
    groups
}

#[tokio::test]
async fn only_the_provider_with_enough_inventory_matches() {
    let store = Arc::new(FakeGraphStore::new());
    let roomy = store.add_root("roomy");
    store.add_inventory(&roomy, ResourceClassId::Standard(0), 64, 1.0); // VCPU
    store.add_inventory(&roomy, ResourceClassId::Standard(1), 65536, 1.0); // MEMORY_MB

    let cramped = store.add_root("cramped");
    store.add_inventory(&cramped, ResourceClassId::Standard(0), 64, 1.0);
    store.add_inventory(&cramped, ResourceClassId::Standard(1), 1024, 1.0);

    let groups = single_group(&[("VCPU", 8), ("MEMORY_MB", 8192)]);
    let (candidates, summaries) = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].provider_uuids(), vec![roomy.uuid]);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].provider_uuid, roomy.uuid);
}

#[tokio::test]
async fn required_trait_excludes_providers_lacking_it() {
    let store = Arc::new(FakeGraphStore::new());
    let fast = store.add_root("fast");
    store.add_inventory(&fast, ResourceClassId::Standard(0), 64, 1.0);
    store.add_trait(&fast, TraitId::Standard(1)); // HW_CPU_X86_AVX2

    let slow = store.add_root("slow");
    store.add_inventory(&slow, ResourceClassId::Standard(0), 64, 1.0);

    let mut groups = single_group(&[("VCPU", 4)]);
    groups.get_mut(UNSUFFIXED_GROUP_KEY).unwrap().required_traits =
        HashSet::from(["HW_CPU_X86_AVX2".to_owned()]);

    let (candidates, _) = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].provider_uuids(), vec![fast.uuid]);
}

#[tokio::test]
async fn unknown_resource_class_fails_before_any_storage_read() {
    let store = Arc::new(FakeGraphStore::new());
    let groups = single_group(&[("CUSTOM_NOT_REGISTERED", 1)]);

    let err = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, placement_domain::error::Error::ResourceClassNotFound { .. }));
}

#[tokio::test]
async fn unknown_required_trait_fails_before_any_storage_read() {
    // Spec scenario: a required trait that resolves in neither the
    // standard catalogue nor the custom cache is a `TraitNotFound` error,
    // never a silently empty candidate list.
    let store = Arc::new(FakeGraphStore::new());
    let mut groups = single_group(&[("VCPU", 1)]);
    groups.get_mut(UNSUFFIXED_GROUP_KEY).unwrap().required_traits =
        HashSet::from(["UNKNOWN_TRAIT".to_owned()]);

    let err = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, placement_domain::error::Error::TraitNotFound { .. }));
}

#[tokio::test]
async fn empty_request_groups_is_a_bad_request() {
    let store = Arc::new(FakeGraphStore::new());
    let groups = RequestGroups::new();
    let err = engine(store)
        .allocation_candidates(&groups, &RequestContext::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, placement_domain::error::Error::BadRequest { .. }));
}
