//! Resource class entity and the fixed standard catalogue.

use serde::{Deserialize, Serialize};

use crate::entities::ids::ResourceClassId;

/// The fixed, ordered list of standard resource class names. Index in this
/// list is the class's standard id. Custom classes are never present here;
/// their names are always prefixed `CUSTOM_` and their ids are assigned by
/// the persistence backend at creation time.
pub const STANDARD_RESOURCE_CLASSES: &[&str] = &[
    "VCPU",
    "MEMORY_MB",
    "DISK_GB",
    "PCI_DEVICE",
    "SRIOV_NET_VF",
    "NUMA_SOCKET",
    "NUMA_CORE",
    "NUMA_THREAD",
    "NUMA_MEMORY_MB",
    "IPV4_ADDRESS",
    "VGPU",
    "VGPU_DISPLAY_HEAD",
    "NET_BANDWIDTH_EGRESS_KILOBIT_PER_SEC",
    "NET_BANDWIDTH_INGRESS_KILOBIT_PER_SEC",
    "PCPU",
    "FPGA",
];

/// A fully resolved resource class: its id (tagged standard/custom) and
/// canonical name. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceClass {
    /// Compact identifier.
    pub id: ResourceClassId,
    /// Canonical name, e.g. `VCPU` or `CUSTOM_MAGIC`.
    pub name: String,
}

impl ResourceClass {
    /// `true` if this class is outside the standard catalogue.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self.id, ResourceClassId::Custom(_))
    }
}

/// Prefix required of every custom resource class name.
pub const CUSTOM_RESOURCE_CLASS_PREFIX: &str = "CUSTOM_";
