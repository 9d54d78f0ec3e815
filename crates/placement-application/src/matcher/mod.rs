//! The Candidate Matcher (spec §4.5): resolves a request group against the
//! provider graph and produces allocation request candidates.
//!
//! [`single_provider`] implements the `use_same_provider=true` path
//! (§4.5.2); [`mixed`] implements the general path that draws across a
//! provider's tree and any sharing providers reachable from it (§4.5.3).
//! Both paths return a [`GroupMatchResult`] so the caller can merge the
//! provider data they happened to touch into a shared cache rather than
//! re-fetching it in the assembler.

pub mod mixed;
pub mod single_provider;

use std::collections::HashMap;

use placement_domain::ports::ProviderTreeNode;
use placement_domain::value_objects::AllocationRequest;
use uuid::Uuid;

/// One request group's raw candidates, plus every provider's tree data
/// observed while producing them.
#[derive(Debug, Clone, Default)]
pub struct GroupMatchResult {
    /// Every candidate this group alone admits.
    pub candidates: Vec<AllocationRequest>,
    /// Provider tree data fetched while matching, keyed by uuid so the
    /// assembler can build summaries without a second round trip.
    pub providers: HashMap<Uuid, ProviderTreeNode>,
}
