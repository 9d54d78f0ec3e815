//! Process-lived registry caches for resource classes and traits.
//!
//! Both registries share the same shape: standard entries resolve from a
//! fixed in-process table without touching storage or taking any lock;
//! custom entries are cached after the first lookup and refreshed behind
//! a single named lock per spec §4.1/§4.2/§5.

mod named_lock;
mod resource_class;
mod trait_registry;

pub use named_lock::NamedLock;
pub use resource_class::{ResourceClassRegistry, RESOURCE_CLASS_CACHE_LOCK_NAME};
pub use trait_registry::{TraitRegistry, TRAIT_CACHE_LOCK_NAME};
