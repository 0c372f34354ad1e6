//! # Embedded in-memory registry backend.
//!
//! [`MemoryRegistry`] keeps items and edges in process memory and feeds
//! watch streams from a broadcast channel. It is the default backend behind
//! `mem://` URLs and the workhorse of the test suite; a fleet sharing one
//! process (or one test) shares a single instance.
//!
//! ## Rules
//! - `register` of an existing id is an update (watch action `Update`)
//! - `deregister` with the full option cascades through outgoing edges
//! - watch pumps filter server-side and stop on their cancellation token

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::RegistryError;
use crate::registry::filter::{ActionKind, Edge, ItemFilter, RegisterOptions};
use crate::registry::item::{ItemRef, RegistryItem};
use crate::registry::watch::{RegistryEvent, Watch};
use crate::registry::{Registry, RegistryOpener, RegistryRef};

const EVENT_CAPACITY: usize = 256;
const WATCH_BUFFER: usize = 64;

/// In-memory registry: items by id, labeled edges, broadcast watch feed.
pub struct MemoryRegistry {
    items: DashMap<String, ItemRef>,
    edges: RwLock<Vec<Edge>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            items: DashMap::new(),
            edges: RwLock::new(Vec::new()),
            events,
        })
    }

    /// True when an edge `from --label--> to` exists.
    pub fn has_edge(&self, from: &str, to: &str, label: &str) -> bool {
        self.edges
            .read()
            .expect("edge lock poisoned")
            .iter()
            .any(|e| e.from == from && e.to == to && e.label == label)
    }

    /// Snapshot of all edges leaving `from`.
    pub fn edges_from(&self, from: &str) -> Vec<Edge> {
        self.edges
            .read()
            .expect("edge lock poisoned")
            .iter()
            .filter(|e| e.from == from)
            .cloned()
            .collect()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no items are stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes `id`, its edges, and (when `full`) everything reachable
    /// through its outgoing edges. Collects removed items for event emission.
    fn remove_tree(&self, id: &str, full: bool, removed: &mut Vec<ItemRef>) {
        let Some((_, item)) = self.items.remove(id) else {
            return;
        };
        removed.push(item);

        let outgoing: Vec<String> = {
            let mut edges = self.edges.write().expect("edge lock poisoned");
            let out = edges
                .iter()
                .filter(|e| e.from == id)
                .map(|e| e.to.clone())
                .collect();
            edges.retain(|e| e.from != id && e.to != id);
            out
        };

        if full {
            for target in outgoing {
                self.remove_tree(&target, full, removed);
            }
        }
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(&self, item: ItemRef, opts: RegisterOptions) -> Result<(), RegistryError> {
        let id = item.id().to_string();
        let existed = self.items.contains_key(&id);
        self.items.insert(id.clone(), Arc::clone(&item));

        if let Some(edge) = &opts.edge_to {
            self.edges.write().expect("edge lock poisoned").push(Edge {
                from: edge.other.clone(),
                to: id,
                label: edge.label.clone(),
                metadata: edge.metadata.clone(),
            });
        }

        let action = if existed {
            ActionKind::Update
        } else {
            ActionKind::Create
        };
        let _ = self.events.send(RegistryEvent { action, item });
        Ok(())
    }

    async fn deregister(&self, item: ItemRef, opts: RegisterOptions) -> Result<(), RegistryError> {
        if !self.items.contains_key(item.id()) {
            if opts.fail_fast {
                return Err(RegistryError::NotFound {
                    name: item.name().to_string(),
                });
            }
            return Ok(());
        }

        let mut removed = Vec::new();
        self.remove_tree(item.id(), opts.deregister_full, &mut removed);
        for it in removed {
            let _ = self.events.send(RegistryEvent {
                action: ActionKind::Delete,
                item: it,
            });
        }
        Ok(())
    }

    async fn register_edge(
        &self,
        from: &str,
        to: &str,
        label: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), RegistryError> {
        self.edges.write().expect("edge lock poisoned").push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            label: label.to_string(),
            metadata,
        });
        Ok(())
    }

    async fn list(&self, filter: ItemFilter) -> Result<Vec<ItemRef>, RegistryError> {
        Ok(self
            .items
            .iter()
            .filter(|entry| filter.matches_item(entry.value().as_ref()))
            .map(|entry| Arc::clone(entry.value()))
            .collect())
    }

    async fn get(&self, name: &str, filter: ItemFilter) -> Result<ItemRef, RegistryError> {
        let filter = filter.name(name);
        self.items
            .iter()
            .find(|entry| filter.matches_item(entry.value().as_ref()))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    async fn watch(&self, filter: ItemFilter) -> Result<Watch, RegistryError> {
        let mut feed = self.events.subscribe();
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let cancel = CancellationToken::new();
        let pump_cancel = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = pump_cancel.cancelled() => break,
                    ev = feed.recv() => match ev {
                        Ok(ev) => {
                            if filter.matches_event(&ev) && tx.send(ev).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Ok(Watch::new(rx, cancel))
    }
}

/// Opener for in-memory registries.
///
/// Pre-seeded URLs resolve to their registered instance; unseen `mem://`
/// URLs lazily create a fresh registry (cached for later opens); anything
/// else fails with [`RegistryError::UnknownUrl`].
#[derive(Default)]
pub struct MemoryOpener {
    registries: DashMap<String, RegistryRef>,
}

impl MemoryOpener {
    /// Creates an opener with no pre-seeded URLs.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pre-seeds `url` with an existing registry instance.
    pub fn insert(&self, url: impl Into<String>, registry: RegistryRef) {
        self.registries.insert(url.into(), registry);
    }
}

#[async_trait]
impl RegistryOpener for MemoryOpener {
    async fn open(&self, url: &str) -> Result<RegistryRef, RegistryError> {
        if let Some(reg) = self.registries.get(url) {
            return Ok(Arc::clone(reg.value()));
        }
        if url.starts_with("mem://") {
            let reg: RegistryRef = MemoryRegistry::new();
            self.registries.insert(url.to_string(), Arc::clone(&reg));
            return Ok(reg);
        }
        Err(RegistryError::UnknownUrl {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::item::{ItemInfo, ItemKind, META_STATUS};
    use crate::registry::EDGE_NODE;

    fn info(kind: ItemKind, name: &str) -> ItemRef {
        ItemInfo::new(kind, name).item()
    }

    #[tokio::test]
    async fn register_and_get_by_name_and_kind() {
        let reg = MemoryRegistry::new();
        reg.register(info(ItemKind::Service, "search"), RegisterOptions::new())
            .await
            .unwrap();

        let found = reg
            .get("search", ItemFilter::new().kind(ItemKind::Service))
            .await
            .unwrap();
        assert_eq!(found.name(), "search");

        let miss = reg
            .get("search", ItemFilter::new().kind(ItemKind::Server))
            .await;
        assert!(miss.is_err());
    }

    #[tokio::test]
    async fn register_with_edge_links_other_to_item() {
        let reg = MemoryRegistry::new();
        let root = ItemInfo::new(ItemKind::Node, "node").with_id("root-1").item();
        reg.register(root, RegisterOptions::new()).await.unwrap();

        let svc = ItemInfo::new(ItemKind::Service, "svc").with_id("svc-1").item();
        reg.register(
            svc,
            RegisterOptions::new().with_edge_to("root-1", EDGE_NODE, HashMap::new()),
        )
        .await
        .unwrap();

        assert!(reg.has_edge("root-1", "svc-1", EDGE_NODE));
    }

    #[tokio::test]
    async fn full_deregister_cascades_through_outgoing_edges() {
        let reg = MemoryRegistry::new();
        let root = ItemInfo::new(ItemKind::Node, "node").with_id("root-1").item();
        let svc = ItemInfo::new(ItemKind::Service, "svc").with_id("svc-1").item();
        reg.register(Arc::clone(&root), RegisterOptions::new())
            .await
            .unwrap();
        reg.register(
            svc,
            RegisterOptions::new().with_edge_to("root-1", EDGE_NODE, HashMap::new()),
        )
        .await
        .unwrap();

        reg.deregister(root, RegisterOptions::new().with_deregister_full())
            .await
            .unwrap();

        assert!(reg.is_empty());
        assert!(reg.edges_from("root-1").is_empty());
    }

    #[tokio::test]
    async fn fail_fast_deregister_of_missing_item_errors() {
        let reg = MemoryRegistry::new();
        let ghost = info(ItemKind::Service, "ghost");
        assert!(reg
            .deregister(Arc::clone(&ghost), RegisterOptions::new())
            .await
            .is_ok());
        assert!(reg
            .deregister(ghost, RegisterOptions::new().with_fail_fast())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn watch_filters_by_kind_name_and_stops() {
        let reg = MemoryRegistry::new();
        let mut watch = reg
            .watch(
                ItemFilter::new()
                    .kind(ItemKind::Service)
                    .name("watched")
                    .action(ActionKind::Any),
            )
            .await
            .unwrap();

        reg.register(info(ItemKind::Service, "other"), RegisterOptions::new())
            .await
            .unwrap();
        reg.register(
            ItemInfo::new(ItemKind::Service, "watched")
                .with_metadata(META_STATUS, "Ready")
                .item(),
            RegisterOptions::new(),
        )
        .await
        .unwrap();

        let ev = watch.next().await.unwrap();
        assert_eq!(ev.item.name(), "watched");
        assert_eq!(ev.action, ActionKind::Create);

        watch.stop();
        assert!(watch.next().await.is_err());
    }
}
