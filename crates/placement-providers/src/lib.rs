//! # Providers Layer
//!
//! Persistence adapters implementing `placement-domain`'s
//! [`placement_domain::ports::ProviderGraphStore`],
//! [`placement_domain::ports::ResourceClassStore`] and
//! [`placement_domain::ports::TraitStore`] ports.
//!
//! | Feature | Backend |
//! |---------|---------|
//! | `memory` (default) | [`memory::MemoryGraphStore`] — process-local, mutex-guarded |
//! | `sqlite` | [`sqlite::SqliteGraphStore`] — durable, `sqlx`-backed |

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
