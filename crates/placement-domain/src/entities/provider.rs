//! Resource provider entity: the nodes of the provider tree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::ids::ProviderId;

/// A resource provider: a node in a (possibly single-node) provider tree.
///
/// A provider with no parent is its own root. Root-less legacy records
/// (`root_id: None`) are tolerated and must be treated as single-node
/// trees rooted at themselves — see [`ResourceProvider::root_id_or_self`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProvider {
    /// Compact identifier.
    pub id: ProviderId,
    /// Stable external identifier.
    pub uuid: Uuid,
    /// Unique display name.
    pub name: String,
    /// Parent in the provider tree, if any.
    pub parent_id: Option<ProviderId>,
    /// Root of the provider tree. May be absent in legacy records; callers
    /// must fall back to [`ResourceProvider::root_id_or_self`] rather than
    /// treat `None` as "no root".
    pub root_id: Option<ProviderId>,
    /// Optimistic-concurrency counter, bumped on every write that touches
    /// this provider (including inventory, trait, and allocation writes).
    pub generation: u32,
}

impl ResourceProvider {
    /// The effective root of this provider's tree, tolerating legacy rows
    /// that never had `root_id` populated.
    #[must_use]
    pub fn root_id_or_self(&self) -> ProviderId {
        self.root_id.unwrap_or(self.id)
    }

    /// `true` if this provider has no parent, i.e. it is a tree root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
