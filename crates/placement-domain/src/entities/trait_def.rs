//! Trait entity and the fixed standard catalogue.

use serde::{Deserialize, Serialize};

use crate::entities::ids::TraitId;

/// The well-known trait that marks a provider as a *sharing provider*: its
/// inventory is usable by any non-sharing provider that shares an
/// aggregate with it.
pub const MISC_SHARES_VIA_AGGREGATE: &str = "MISC_SHARES_VIA_AGGREGATE";

/// The fixed, ordered list of standard trait names. Index in this list is
/// the trait's standard id. Custom traits are never present here; their
/// names are always prefixed `CUSTOM_`.
pub const STANDARD_TRAITS: &[&str] = &[
    MISC_SHARES_VIA_AGGREGATE,
    "HW_CPU_X86_AVX2",
    "HW_CPU_X86_AVX512F",
    "HW_NIC_OFFLOAD_GENEVE",
    "HW_NIC_OFFLOAD_VXLAN",
    "HW_NIC_SRIOV",
    "STORAGE_DISK_SSD",
    "STORAGE_DISK_HDD",
    "COMPUTE_VOLUME_MULTI_ATTACH",
    "COMPUTE_TRUSTED_CERTS",
];

/// A fully resolved trait: its id (tagged standard/custom) and canonical
/// name. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trait {
    /// Compact identifier.
    pub id: TraitId,
    /// Canonical name, e.g. `HW_CPU_X86_AVX2` or `CUSTOM_RACK_A`.
    pub name: String,
}

impl Trait {
    /// `true` if this trait is outside the standard catalogue.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self.id, TraitId::Custom(_))
    }
}

/// Prefix required of every custom trait name.
pub const CUSTOM_TRAIT_PREFIX: &str = "CUSTOM_";
