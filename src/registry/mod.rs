//! # Registry capability.
//!
//! The registry is the shared system of record for a fleet of manager
//! processes: it stores polymorphic [`RegistryItem`]s (nodes, servers,
//! services) with metadata and labeled edges, and exposes filtered queries
//! and watch streams over them.
//!
//! This module defines the capability surface the manager consumes:
//!
//! - [`Registry`]: register/deregister/list/get/watch over items
//! - [`RegistryOpener`]: resolve a registry from a URL
//! - [`RegistryItem`] / [`ItemInfo`]: the polymorphic item model with
//!   `as_service` / `as_server` capability probes
//! - [`ItemFilter`] / [`RegisterOptions`]: query filters and call options
//! - [`Watch`]: a stoppable event stream
//! - [`MemoryRegistry`]: the embedded in-memory backend (`mem://` URLs)

mod filter;
mod item;
mod memory;
mod watch;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RegistryError;

pub use filter::{ActionKind, Edge, ItemFilter, RegisterOptions, EDGE_FORK, EDGE_NODE};
pub use item::{
    ItemInfo, ItemKind, ItemRef, RegistryItem, ServerItem, ServiceItem, Status, META_STATUS,
    NODE_META_PID,
};
pub use memory::{MemoryOpener, MemoryRegistry};
pub use watch::{RegistryEvent, Watch, WatchStopper};

/// Shared handle to a registry backend.
pub type RegistryRef = Arc<dyn Registry>;

/// # Registry backend capability.
///
/// All methods are suspension points: a backend may be remote and block
/// indefinitely. The manager never assumes more than eventual consistency
/// across processes sharing a registry.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Registers (or re-registers) an item.
    ///
    /// With [`RegisterOptions::with_edge_to`], additionally records an edge
    /// from the given item to the registered one.
    async fn register(&self, item: ItemRef, opts: RegisterOptions) -> Result<(), RegistryError>;

    /// Removes an item.
    ///
    /// With [`RegisterOptions::with_deregister_full`], removal cascades
    /// through the item's outgoing edges. With
    /// [`RegisterOptions::with_fail_fast`], a missing item is an error
    /// instead of a no-op.
    async fn deregister(&self, item: ItemRef, opts: RegisterOptions) -> Result<(), RegistryError>;

    /// Records a labeled edge between two items.
    async fn register_edge(
        &self,
        from: &str,
        to: &str,
        label: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), RegistryError>;

    /// Lists all items matching the filter.
    async fn list(&self, filter: ItemFilter) -> Result<Vec<ItemRef>, RegistryError>;

    /// Returns the first item with the given name matching the filter.
    async fn get(&self, name: &str, filter: ItemFilter) -> Result<ItemRef, RegistryError>;

    /// Opens a watch stream over registry changes matching the filter.
    async fn watch(&self, filter: ItemFilter) -> Result<Watch, RegistryError>;
}

/// Resolves a registry backend from a URL.
///
/// Planning opens the *source* registry (where service definitions live)
/// through this seam; it may differ from the shared target registry.
#[async_trait]
pub trait RegistryOpener: Send + Sync {
    /// Opens the registry at `url`.
    async fn open(&self, url: &str) -> Result<RegistryRef, RegistryError>;
}
