//! # Domain Layer
//!
//! Core types, ports and pure business logic for the allocation candidate
//! engine: resource classes, traits, resource providers, inventory
//! records and allocations; the provider-graph-store and catalog-store
//! ports the application layer matches against; the inventory accountant;
//! and the resource-class/trait registries.
//!
//! ## Architecture
//!
//! | Component | Description |
//! |-----------|--------------|
//! | [`entities`] | Core entities with identity: providers, classes, traits, inventory, allocations |
//! | [`value_objects`] | Request groups and candidate output types |
//! | [`ports`] | Persistence interfaces consumed by the matcher |
//! | [`registry`] | Resource-class and trait id/name registries |
//! | [`inventory`] | Pure effective-capacity/availability computation |
//! | [`error`] | Boundary error taxonomy |
//!
//! No infrastructure concerns (logging setup, configuration loading, SQL)
//! live here — only standard library, `async-trait` for port signatures,
//! and a narrow `tokio::sync` dependency for the registries' caches.

/// Core business entities with identity.
pub mod entities;
/// Domain error types.
pub mod error;
/// Pure inventory accounting (effective capacity/availability).
pub mod inventory;
/// External persistence port interfaces.
pub mod ports;
/// Resource-class and trait registries.
pub mod registry;
/// Immutable value objects exchanged at the domain boundary.
pub mod value_objects;

pub use error::{Error, Result};
