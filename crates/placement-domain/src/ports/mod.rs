//! External port interfaces consumed by the domain and application layers.

mod catalog_store;
mod graph_store;

pub use catalog_store::{ResourceClassStore, TraitStore};
pub use graph_store::{ProviderGraphStore, ProviderTreeNode, RequestContext};
