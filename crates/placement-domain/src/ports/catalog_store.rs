//! Persistence ports consumed by the resource-class and trait registries.

use async_trait::async_trait;

use crate::entities::{ResourceClass, Trait};
use crate::error::Result;

/// Storage backend for custom (non-standard) resource classes.
///
/// Implemented by `placement-providers`. The registry issues exactly one
/// call to [`list_custom_resource_classes`](ResourceClassStore::list_custom_resource_classes)
/// per cache refresh, never one call per name.
#[async_trait]
pub trait ResourceClassStore: Send + Sync {
    /// Fetch every custom resource class currently persisted.
    async fn list_custom_resource_classes(&self) -> Result<Vec<ResourceClass>>;

    /// Persist a new custom resource class and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already taken or does not carry the
    /// `CUSTOM_` prefix.
    async fn create_custom_resource_class(&self, name: &str) -> Result<ResourceClass>;
}

/// Storage backend for custom (non-standard) traits.
#[async_trait]
pub trait TraitStore: Send + Sync {
    /// Fetch every custom trait currently persisted.
    async fn list_custom_traits(&self) -> Result<Vec<Trait>>;

    /// Persist a new custom trait and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already taken or does not carry the
    /// `CUSTOM_` prefix.
    async fn create_custom_trait(&self, name: &str) -> Result<Trait>;
}
