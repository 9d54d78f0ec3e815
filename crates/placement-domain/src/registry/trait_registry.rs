//! Trait Registry: bidirectional mapping between trait names and compact
//! integer identifiers (spec §4.2).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::entities::{Trait, TraitId, STANDARD_TRAITS};
use crate::error::{Error, Result};
use crate::ports::TraitStore;
use crate::registry::named_lock::NamedLock;

/// Name of the process-wide lock guarding trait cache refreshes.
pub const TRAIT_CACHE_LOCK_NAME: &str = "trait_cache";

#[derive(Default)]
struct Cache {
    by_name: HashMap<String, Trait>,
    by_id: HashMap<TraitId, String>,
    populated: bool,
}

fn standard_index(name: &str) -> Option<u16> {
    STANDARD_TRAITS
        .iter()
        .position(|candidate| *candidate == name)
        .map(|idx| idx as u16)
}

/// Process-lived, lazily-initialized cache of custom traits, backed by a
/// [`TraitStore`]. Standard traits never touch storage or the lock.
pub struct TraitRegistry {
    store: Arc<dyn TraitStore>,
    cache: RwLock<Cache>,
    lock_name: NamedLock,
}

impl TraitRegistry {
    /// Build a registry over the given storage backend.
    #[must_use]
    pub fn new(store: Arc<dyn TraitStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(Cache::default()),
            lock_name: NamedLock::new(TRAIT_CACHE_LOCK_NAME),
        }
    }

    /// The name of the coordination lock this registry uses for refreshes.
    #[must_use]
    pub fn lock_name(&self) -> &'static str {
        self.lock_name.name()
    }

    /// Resolve a trait name to its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TraitNotFound`] if `name` resolves in neither the
    /// standard catalogue nor the custom cache/backend. Supplying an
    /// unknown trait name must surface this error before any other work
    /// (spec §4.2) — callers resolving a whole request's traits should
    /// fail on the first unresolvable name rather than continue.
    pub async fn id_from_name(&self, name: &str) -> Result<TraitId> {
        if let Some(idx) = standard_index(name) {
            return Ok(TraitId::Standard(idx));
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
            .ok_or_else(|| Error::trait_not_found(name))
    }

    /// Resolve a trait id back to its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TraitNotFound`] if `id` resolves in neither the
    /// standard catalogue nor the custom cache/backend.
    pub async fn name_from_id(&self, id: TraitId) -> Result<String> {
        if let TraitId::Standard(idx) = id {
            return STANDARD_TRAITS
                .get(idx as usize)
                .map(|name| (*name).to_owned())
                .ok_or_else(|| Error::trait_not_found(format!("standard id {idx}")));
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
            .ok_or_else(|| Error::trait_not_found(format!("{id:?}")))
    }

    /// Resolve a trait name to its full row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TraitNotFound`] if `name` resolves in neither the
    /// standard catalogue nor the custom cache/backend.
    pub async fn record_from_name(&self, name: &str) -> Result<Trait> {
        if let Some(idx) = standard_index(name) {
            return Ok(Trait {
                id: TraitId::Standard(idx),
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
            .ok_or_else(|| Error::trait_not_found(name))
    }

    /// Resolve a whole batch of trait names to ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TraitNotFound`] for the first name in iteration
    /// order that cannot be resolved. Required by spec §4.2 as the bulk
    /// counterpart to [`TraitRegistry::id_from_name`] used when resolving
    /// an entire request group's required/forbidden trait sets.
    pub async fn ids_for_names(
        &self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<HashMap<String, TraitId>> {
        let mut out = HashMap::new();
        for name in names {
            let name = name.as_ref();
            let id = self.id_from_name(name).await?;
            out.insert(name.to_owned(), id);
        }
        Ok(out)
    }

    /// Drop the cached custom-trait maps.
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
        let records = self.store.list_custom_traits().await?;
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
