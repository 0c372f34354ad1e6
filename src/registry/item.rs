//! # The polymorphic registry item model.
//!
//! Registry backends store [`RegistryItem`] trait objects. An item can
//! present multiple capability shapes: a live in-memory service or server
//! (probed with [`RegistryItem::as_service`] / [`RegistryItem::as_server`])
//! or a plain projection ([`ItemInfo`]) whose probes return `None`, forcing
//! callers to fall back to their local handle maps.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::server::{Server, ServerRef};
use crate::service::{Service, ServiceRef};

/// Metadata key under which a root node stores its OS process id.
pub const NODE_META_PID: &str = "pid";

/// Metadata key under which items expose their lifecycle status.
pub const META_STATUS: &str = "status";

/// Shared handle to a registry item.
pub type ItemRef = Arc<dyn RegistryItem>;

/// Type of a registry item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// A process's root node.
    Node,
    /// A transport server.
    Server,
    /// A logical service.
    Service,
    /// Anything else a backend may store.
    Generic,
}

/// Lifecycle status of a server or service.
///
/// The `Display` strings are the literals stored under [`META_STATUS`];
/// uniqueness arbitration compares against `"Stopped"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not running.
    Stopped,
    /// Coming up.
    Starting,
    /// Running and accepting work.
    Ready,
    /// Going down.
    Stopping,
}

impl Status {
    /// The metadata literal for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Stopped => "Stopped",
            Status::Starting => "Starting",
            Status::Ready => "Ready",
            Status::Stopping => "Stopping",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # A polymorphic registry item.
///
/// Backends store and return these; the capability probes downcast to the
/// concrete shapes the manager operates on. The default probes return
/// `None`; only live adapters ([`ServiceItem`], [`ServerItem`]) override
/// them.
pub trait RegistryItem: Send + Sync {
    /// Opaque, fleet-unique id.
    fn id(&self) -> &str;

    /// The item type.
    fn kind(&self) -> ItemKind;

    /// Human-readable name; services are commanded and arbitrated by name.
    fn name(&self) -> &str;

    /// A snapshot of the item's metadata.
    fn metadata(&self) -> HashMap<String, String>;

    /// Probes for a live in-memory service handle.
    fn as_service(&self) -> Option<ServiceRef> {
        None
    }

    /// Probes for a live in-memory server handle.
    fn as_server(&self) -> Option<ServerRef> {
        None
    }
}

/// Generates a fresh item id.
pub(crate) fn new_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// # A registry-side projection of an item.
///
/// Carries identity and metadata only; both capability probes return
/// `None`. This is what a sibling process sees for items it does not hold
/// in memory.
#[derive(Clone, Debug)]
pub struct ItemInfo {
    id: String,
    kind: ItemKind,
    name: String,
    metadata: HashMap<String, String>,
}

impl ItemInfo {
    /// Creates a projection with a fresh id and empty metadata.
    pub fn new(kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id: new_item_id(),
            kind,
            name: name.into(),
            metadata: HashMap::new(),
        }
    }

    /// Overrides the generated id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Adds one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Wraps the projection into an [`ItemRef`].
    pub fn item(self) -> ItemRef {
        Arc::new(self)
    }
}

impl RegistryItem for ItemInfo {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> HashMap<String, String> {
        self.metadata.clone()
    }
}

/// # Live service adapter.
///
/// Registers a running [`Service`](crate::service::Service) handle as a
/// registry item; `as_service` yields the handle back and the status
/// metadata always reflects the live status.
pub struct ServiceItem(ServiceRef);

impl ServiceItem {
    /// Wraps a live service handle into an [`ItemRef`].
    pub fn item(svc: ServiceRef) -> ItemRef {
        Arc::new(Self(svc))
    }
}

impl RegistryItem for ServiceItem {
    fn id(&self) -> &str {
        self.0.id()
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Service
    }

    fn name(&self) -> &str {
        self.0.name()
    }

    fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([(META_STATUS.to_string(), self.0.status().to_string())])
    }

    fn as_service(&self) -> Option<ServiceRef> {
        Some(Arc::clone(&self.0))
    }
}

/// # Live server adapter.
pub struct ServerItem(ServerRef);

impl ServerItem {
    /// Wraps a live server handle into an [`ItemRef`].
    pub fn item(srv: ServerRef) -> ItemRef {
        Arc::new(Self(srv))
    }
}

impl RegistryItem for ServerItem {
    fn id(&self) -> &str {
        self.0.id()
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Server
    }

    fn name(&self) -> &str {
        self.0.name()
    }

    fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            (META_STATUS.to_string(), self.0.status().to_string()),
            ("scheme".to_string(), self.0.scheme().to_string()),
        ])
    }

    fn as_server(&self) -> Option<ServerRef> {
        Some(Arc::clone(&self.0))
    }
}
