//! Matching behavior recognized by the candidate matcher itself, as
//! distinct from the infrastructure layer's concern of *how* these values
//! are loaded (file, environment, defaults — see `placement-infrastructure`).

/// The two knobs the matcher consults, per spec §4.5.3 step 6/7.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
    /// When `true`, the deduplicated candidate list is shuffled before the
    /// limit is applied. Stable ordering (sorted by provider id) is kept
    /// when `false`.
    pub randomize_allocation_candidates: bool,
    /// Applied when a query does not supply its own limit. `None` means
    /// unlimited.
    pub default_candidate_limit: Option<usize>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            randomize_allocation_candidates: false,
            default_candidate_limit: None,
        }
    }
}
