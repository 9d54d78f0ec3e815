//! The caller-facing request group: what a query is asking for.

use std::collections::{BTreeMap, HashSet};

use crate::entities::AggregateId;

/// A single request group: a set of resource-class quantities, optional
/// trait constraints, optional aggregate-membership constraints, and a
/// flag selecting the single-provider vs. mixed matching path.
///
/// `resources` uses a `BTreeMap` keyed by resource class name (rather than
/// a `HashMap`) purely so that iteration order — and therefore the order
/// in which resource classes are narrowed during matching — is
/// deterministic without requiring callers to pre-sort anything.
#[derive(Debug, Clone, Default)]
pub struct RequestGroup {
    /// Requested amount per resource class name.
    pub resources: BTreeMap<String, u32>,
    /// Trait names every provider referenced by a candidate must
    /// collectively bear (see spec §4.5.3 step 4).
    pub required_traits: HashSet<String>,
    /// Trait names no provider referenced by a candidate may bear.
    pub forbidden_traits: HashSet<String>,
    /// AND of ORs over aggregate membership: the provider must be in at
    /// least one aggregate from every inner set.
    pub member_of: Vec<HashSet<AggregateId>>,
    /// `true` ⇒ a single provider must supply every requested resource
    /// class in this group. `false` ⇒ resources may be split across a
    /// provider's tree and providers sharing an aggregate with it.
    pub use_same_provider: bool,
}

impl RequestGroup {
    /// Start building a request group with a resource amount map.
    #[must_use]
    pub fn new(resources: BTreeMap<String, u32>) -> Self {
        Self {
            resources,
            ..Self::default()
        }
    }

    /// Set the required traits.
    #[must_use]
    pub fn with_required_traits(mut self, traits: HashSet<String>) -> Self {
        self.required_traits = traits;
        self
    }

    /// Set the forbidden traits.
    #[must_use]
    pub fn with_forbidden_traits(mut self, traits: HashSet<String>) -> Self {
        self.forbidden_traits = traits;
        self
    }

    /// Set the aggregate-membership constraint (AND of ORs).
    #[must_use]
    pub fn with_member_of(mut self, member_of: Vec<HashSet<AggregateId>>) -> Self {
        self.member_of = member_of;
        self
    }

    /// Set `use_same_provider`.
    #[must_use]
    pub fn with_use_same_provider(mut self, use_same_provider: bool) -> Self {
        self.use_same_provider = use_same_provider;
        self
    }
}

/// A mapping of request-group key to [`RequestGroup`]. An empty key (`""`)
/// denotes the unsuffixed group, which is the only one allowed to draw
/// across providers and sharing providers; any other key is a granular
/// group and is matched as if `use_same_provider` were forced `true`
/// regardless of what the caller set, per spec §4.5.
pub type RequestGroups = BTreeMap<String, RequestGroup>;

/// The well-known key denoting the unsuffixed request group.
pub const UNSUFFIXED_GROUP_KEY: &str = "";
