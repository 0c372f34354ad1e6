//! # Manager: owns the lifecycle of services and their backing servers.
//!
//! The [`Manager`] multiplexes logical services onto scheme-keyed servers
//! and keeps that lifecycle in sync with the shared registry, a
//! configuration watch, and the broker's command topic.
//!
//! ## Architecture
//! ```text
//! ManagerBuilder::build()
//!       │
//!       ├──► topology bootstrap (adopt or create root node, Fork edge)
//!       │
//! Manager::init()
//!       │
//!       └──► planner: source registry ──► retained services/servers maps
//!
//! Manager::serve_all() ──► start_server per stopped server (parallel)
//!                              │
//!                              ├──► unique w/ incumbent ──► arbiter task
//!                              └──► srv.serve(hooks of attached services)
//!
//! watch_services_configs() ──► restart services with auto-restart
//! watch_broker()           ──► start/stop/restart by command
//! Manager::stop_all()      ──► stop services, then servers, drop root node
//! ```
//!
//! ## Rules
//! - At most one retained server per transport scheme
//! - Retained maps are populated by `init` and read-only afterwards
//! - Cross-process coordination goes through the registry, never locks

mod arbiter;
mod lifecycle;
mod plan;
mod watchers;

pub use plan::PlanContext;

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use dashmap::DashMap;

use crate::config::ManagerConfig;
use crate::events::{Bus, Event, EventKind};
use crate::registry::{
    ItemFilter, ItemInfo, ItemKind, ItemRef, RegisterOptions, Registry, RegistryItem,
    RegistryOpener, RegistryRef, EDGE_FORK, NODE_META_PID,
};
use crate::runtime::Runtime;
use crate::server::{ServeOptions, ServerOpener, ServerRef};
use crate::service::ServiceRef;
use crate::subscribers::Subscribe;

/// Broker command verb: start an item.
pub const COMMAND_START: &str = "start";
/// Broker command verb: stop an item.
pub const COMMAND_STOP: &str = "stop";
/// Broker command verb: stop, then start an item.
pub const COMMAND_RESTART: &str = "restart";

/// Owns the in-process services and servers and keeps their lifecycle in
/// sync with the registry, configuration, and broker.
pub struct Manager {
    /// Self-handle for spawning long-lived tasks from `&self` methods.
    me: Weak<Manager>,
    runtime: Runtime,
    src_url: String,
    reg: RegistryRef,
    registry_opener: Arc<dyn RegistryOpener>,
    server_opener: Arc<dyn ServerOpener>,
    cfg: ManagerConfig,
    bus: Bus,
    root: Option<ItemRef>,
    root_is_fork: bool,
    serve_options: RwLock<ServeOptions>,
    /// Retained servers by id; at most one per scheme.
    servers: DashMap<String, ServerRef>,
    /// Retained services by id.
    services: DashMap<String, ServiceRef>,
}

impl Manager {
    /// Starts building a manager over the shared registry.
    ///
    /// `source_url` names the registry holding service definitions (it may
    /// differ from the shared one); `runtime` carries the namespace and
    /// fork identity of this process.
    pub fn builder(
        registry: RegistryRef,
        source_url: impl Into<String>,
        runtime: Runtime,
    ) -> ManagerBuilder {
        ManagerBuilder::new(registry, source_url, runtime)
    }

    /// The registry item representing this process, if bootstrap managed to
    /// create or adopt one.
    pub fn root(&self) -> Option<ItemRef> {
        self.root.clone()
    }

    /// True when this process's root descends from a parent instance.
    pub fn root_is_fork(&self) -> bool {
        self.root_is_fork
    }

    /// Snapshot of the retained servers.
    pub fn servers(&self) -> Vec<ServerRef> {
        self.servers.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Snapshot of the retained services.
    pub fn services(&self) -> Vec<ServiceRef> {
        self.services.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Replaces the ambient serve options used by broker-driven server
    /// starts and single-service starts.
    pub fn set_serve_options(&self, opts: ServeOptions) {
        *self
            .serve_options
            .write()
            .expect("serve options lock poisoned") = opts;
    }

    pub(crate) fn ambient_serve_options(&self) -> ServeOptions {
        self.serve_options
            .read()
            .expect("serve options lock poisoned")
            .clone()
    }

    /// Upgrades the self-handle; the manager is alive whenever one of its
    /// methods runs.
    pub(crate) fn handle(&self) -> Arc<Manager> {
        self.me.upgrade().expect("manager dropped while in use")
    }
}

/// Builder for constructing a [`Manager`].
pub struct ManagerBuilder {
    registry: RegistryRef,
    source_url: String,
    runtime: Runtime,
    cfg: ManagerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    registry_opener: Option<Arc<dyn RegistryOpener>>,
    server_opener: Option<Arc<dyn ServerOpener>>,
}

impl ManagerBuilder {
    /// Creates a builder with default config and no subscribers.
    pub fn new(registry: RegistryRef, source_url: impl Into<String>, runtime: Runtime) -> Self {
        Self {
            registry,
            source_url: source_url.into(),
            runtime,
            cfg: ManagerConfig::default(),
            subscribers: Vec::new(),
            registry_opener: None,
            server_opener: None,
        }
    }

    /// Sets the manager configuration.
    pub fn with_config(mut self, cfg: ManagerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the opener used to resolve the source registry URL.
    ///
    /// Defaults to [`MemoryOpener`](crate::registry::MemoryOpener), which
    /// resolves `mem://` URLs to fresh in-memory registries.
    pub fn with_registry_opener(mut self, opener: Arc<dyn RegistryOpener>) -> Self {
        self.registry_opener = Some(opener);
        self
    }

    /// Sets the opener used to resolve per-scheme servers during planning.
    ///
    /// Without one, any service needing a server fails `init`.
    pub fn with_server_opener(mut self, opener: Arc<dyn ServerOpener>) -> Self {
        self.server_opener = Some(opener);
        self
    }

    /// Builds the manager and bootstraps its registry topology.
    ///
    /// Bootstrap lists the registry's `NODE` items: a node carrying this
    /// process's pid is adopted as root; otherwise a fresh root is created,
    /// and if a node carrying the parent pid was seen, a `Fork` edge links
    /// parent to child. Registry errors leave the root unset; planning
    /// tolerates that by skipping edge creation.
    pub async fn build(self) -> Arc<Manager> {
        let bus = Bus::new(self.cfg.bus_capacity, self.subscribers);

        let mut current: Option<ItemRef> = None;
        let mut parent: Option<ItemRef> = None;
        if let Ok(nodes) = self
            .registry
            .list(ItemFilter::new().kind(ItemKind::Node))
            .await
        {
            let pid = Runtime::current_pid().to_string();
            let ppid = Runtime::parent_pid().to_string();
            for node in nodes {
                let node_pid = node.metadata().get(NODE_META_PID).cloned().unwrap_or_default();
                if node_pid == ppid {
                    parent = Some(node);
                } else if node_pid == pid {
                    current = Some(node);
                }
            }
        }

        let mut root = None;
        let mut root_is_fork = false;
        match current {
            Some(node) => {
                bus.publish(Event::now(EventKind::RootAdopted).with_server(node.id()));
                root = Some(node);
            }
            None => {
                let pid = Runtime::current_pid();
                let node = ItemInfo::new(ItemKind::Node, format!("node-{pid}"))
                    .with_metadata(NODE_META_PID, pid.to_string())
                    .item();
                if self
                    .registry
                    .register(Arc::clone(&node), RegisterOptions::new())
                    .await
                    .is_ok()
                {
                    bus.publish(Event::now(EventKind::RootCreated).with_server(node.id()));
                    if let Some(parent) = parent {
                        root_is_fork = true;
                        let _ = self
                            .registry
                            .register_edge(parent.id(), node.id(), EDGE_FORK, HashMap::new())
                            .await;
                    }
                    root = Some(node);
                }
            }
        }

        let registry_opener = self
            .registry_opener
            .unwrap_or_else(|| crate::registry::MemoryOpener::new());
        let server_opener = self
            .server_opener
            .unwrap_or_else(|| Arc::new(NoServerBackends));

        Arc::new_cyclic(|me| Manager {
            me: me.clone(),
            runtime: self.runtime,
            src_url: self.source_url,
            reg: self.registry,
            registry_opener,
            server_opener,
            cfg: self.cfg,
            bus,
            root,
            root_is_fork,
            serve_options: RwLock::new(ServeOptions::new()),
            servers: DashMap::new(),
            services: DashMap::new(),
        })
    }
}

/// Placeholder opener used when the builder was given none.
struct NoServerBackends;

#[async_trait::async_trait]
impl ServerOpener for NoServerBackends {
    async fn open(
        &self,
        _registry: RegistryRef,
        scheme: &str,
    ) -> Result<ServerRef, crate::error::ServeError> {
        Err(crate::error::ServeError::OpenFailed {
            scheme: scheme.to_string(),
            reason: "no server backend configured".to_string(),
        })
    }
}
