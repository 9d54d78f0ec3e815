//! Compact integer identifiers used throughout the engine.
//!
//! The matcher operates on ids only (see `DESIGN NOTES` in spec §9): names
//! are resolved to ids once at the boundary via the registries, and the
//! `Standard`/`Custom` distinction is carried as a tagged variant rather
//! than re-derived from string prefixes on every lookup.

use serde::{Deserialize, Serialize};

/// Integer identifier for a resource class, tagged with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceClassId {
    /// A well-known class whose id comes from the fixed standard catalogue.
    Standard(u16),
    /// A `CUSTOM_`-prefixed class whose id was assigned at creation time.
    Custom(i64),
}

impl ResourceClassId {
    /// The raw integer value, regardless of origin.
    #[must_use]
    pub fn raw(self) -> i64 {
        match self {
            Self::Standard(id) => i64::from(id),
            Self::Custom(id) => id,
        }
    }
}

/// Integer identifier for a trait, tagged with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TraitId {
    /// A well-known trait from the closed standard catalogue.
    Standard(u16),
    /// A `CUSTOM_`-prefixed trait assigned at creation time.
    Custom(i64),
}

impl TraitId {
    /// The raw integer value, regardless of origin.
    #[must_use]
    pub fn raw(self) -> i64 {
        match self {
            Self::Standard(id) => i64::from(id),
            Self::Custom(id) => id,
        }
    }
}

/// Identifier for a resource provider row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderId(pub i64);

/// Opaque aggregate identifier; aggregates have no independent lifecycle
/// beyond the providers that reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregateId(pub i64);
