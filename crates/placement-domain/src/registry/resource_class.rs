//! Resource-Class Registry: bidirectional mapping between resource-class
//! names and compact integer identifiers (spec §4.1).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::entities::{ResourceClass, ResourceClassId, STANDARD_RESOURCE_CLASSES};
use crate::error::{Error, Result};
use crate::ports::ResourceClassStore;
use crate::registry::named_lock::NamedLock;

/// Name of the process-wide lock guarding resource-class cache refreshes.
/// Part of the contract per spec §5/§9: a multi-process deployment would
/// back this name with an external coordination service.
pub const RESOURCE_CLASS_CACHE_LOCK_NAME: &str = "resource_class_cache";

#[derive(Default)]
struct Cache {
    by_name: HashMap<String, ResourceClass>,
    by_id: HashMap<ResourceClassId, String>,
    populated: bool,
}

fn standard_index(name: &str) -> Option<u16> {
    STANDARD_RESOURCE_CLASSES
        .iter()
        .position(|candidate| *candidate == name)
        .map(|idx| idx as u16)
}

/// Process-lived, lazily-initialized cache of custom resource classes,
/// backed by a [`ResourceClassStore`]. Standard classes never touch
/// storage or the lock.
pub struct ResourceClassRegistry {
    store: Arc<dyn ResourceClassStore>,
    cache: RwLock<Cache>,
    lock_name: NamedLock,
}

impl ResourceClassRegistry {
    /// Build a registry over the given storage backend. No storage is
    /// touched until the first cache miss.
    #[must_use]
    pub fn new(store: Arc<dyn ResourceClassStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(Cache::default()),
            lock_name: NamedLock::new(RESOURCE_CLASS_CACHE_LOCK_NAME),
        }
    }

    /// The name of the coordination lock this registry uses for refreshes.
    #[must_use]
    pub fn lock_name(&self) -> &'static str {
        self.lock_name.name()
    }

    /// Resolve a resource class name to its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceClassNotFound`] if `name` resolves in
    /// neither the standard catalogue nor the custom cache/backend.
    pub async fn id_from_name(&self, name: &str) -> Result<ResourceClassId> {
        if let Some(idx) = standard_index(name) {
            return Ok(ResourceClassId::Standard(idx));
        }
        if let Some(record) = self.cache.read().await.by_name.get(name) {
            return Ok(record.id);
        }
        self.refresh().await?;
        self.cache
            .read()
            .await
            .by_name
            .get(name)
            .map(|record| record.id)
            .ok_or_else(|| Error::resource_class_not_found(name))
    }

    /// Resolve a resource class id back to its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceClassNotFound`] if `id` resolves in
    /// neither the standard catalogue nor the custom cache/backend.
    pub async fn name_from_id(&self, id: ResourceClassId) -> Result<String> {
        if let ResourceClassId::Standard(idx) = id {
            return STANDARD_RESOURCE_CLASSES
                .get(idx as usize)
                .map(|name| (*name).to_owned())
                .ok_or_else(|| Error::resource_class_not_found(format!("standard id {idx}")));
        }
        if let Some(name) = self.cache.read().await.by_id.get(&id) {
            return Ok(name.clone());
        }
        self.refresh().await?;
        self.cache
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::resource_class_not_found(format!("{id:?}")))
    }

    /// Resolve a resource class name to its full row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceClassNotFound`] if `name` resolves in
    /// neither the standard catalogue nor the custom cache/backend.
    pub async fn record_from_name(&self, name: &str) -> Result<ResourceClass> {
        if let Some(idx) = standard_index(name) {
            return Ok(ResourceClass {
                id: ResourceClassId::Standard(idx),
                name: name.to_owned(),
            });
        }
        if let Some(record) = self.cache.read().await.by_name.get(name) {
            return Ok(record.clone());
        }
        self.refresh().await?;
        self.cache
            .read()
            .await
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| Error::resource_class_not_found(name))
    }

    /// Drop the cached custom-class maps. The next lookup repopulates them
    /// from storage.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        *cache = Cache::default();
    }

    /// Refresh the cache from storage, coalescing concurrent misses onto a
    /// single backend read: the named lock serializes refreshers, and the
    /// first action after acquiring it is to re-check the cache, since a
    /// competing task may have already populated it while this one waited.
    async fn refresh(&self) -> Result<()> {
        let _guard = self.lock_name.lock().await;
        if self.cache.read().await.populated {
            return Ok(());
        }
        let records = self.store.list_custom_resource_classes().await?;
        let mut by_name = HashMap::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());
        for record in records {
            by_id.insert(record.id, record.name.clone());
            by_name.insert(record.name.clone(), record);
        }
        let mut cache = self.cache.write().await;
        *cache = Cache {
            by_name,
            by_id,
            populated: true,
        };
        Ok(())
    }
}
