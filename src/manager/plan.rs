//! # Service planner.
//!
//! `init` enumerates service definitions from the *source* registry,
//! filters them by the namespace's required tags, resolves one server per
//! transport scheme, and registers the retained set under the root node in
//! the shared *target* registry.
//!
//! ## Rules
//! - Setup failures (source open, server open) abort `init` entirely
//! - A fork-only service without auto-start is dropped (the parent spawns
//!   it on demand); with auto-start it gets a server but is left for the
//!   child process to register
//! - The maps left behind are exactly the set this process operates on

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::ManagerError;
use crate::registry::{
    ItemFilter, ItemKind, RegisterOptions, Registry, RegistryItem, RegistryRef, ServiceItem,
    EDGE_NODE,
};
use crate::server::{Server, ServerRef};
use crate::service::Service;

use super::Manager;

/// The two registries a planning pass threads through its calls.
///
/// Servers resolve against the shared `target`; service definitions come
/// from `source`. Explicit fields, not ambient state.
#[derive(Clone)]
pub struct PlanContext {
    /// Registry holding the service definitions being planned.
    pub source: RegistryRef,
    /// Shared registry the retained set is registered into.
    pub target: RegistryRef,
}

impl Manager {
    /// Plans this process's service set.
    ///
    /// All-or-nothing: an unresolvable source registry or server scheme
    /// fails the whole call, and `ctx` cancellation aborts registry setup.
    /// Registration of retained services tolerates a missing root node by
    /// skipping edge creation.
    pub async fn init(&self, ctx: CancellationToken) -> Result<(), ManagerError> {
        let source = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(ManagerError::Canceled),
            opened = self.registry_opener.open(&self.src_url) => {
                opened.map_err(|source| ManagerError::SourceRegistryOpen {
                    url: self.src_url.clone(),
                    source,
                })?
            }
        };
        let plan = PlanContext {
            source,
            target: Arc::clone(&self.reg),
        };

        let candidates = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(ManagerError::Canceled),
            listed = plan.source.list(ItemFilter::new().kind(ItemKind::Service)) => listed?,
        };

        let mut by_scheme: HashMap<String, ServerRef> = HashMap::new();

        for item in candidates {
            let Some(svc) = item.as_service() else {
                continue;
            };
            let opts = svc.options();
            let must_fork = opts.fork && !self.runtime.is_fork();

            if !self.runtime.is_required(svc.name(), &opts.tags) && !opts.force_register {
                continue;
            }
            if must_fork && !opts.auto_start {
                continue;
            }

            let scheme = svc.server_scheme().to_string();
            let srv = match by_scheme.get(&scheme) {
                Some(srv) => Arc::clone(srv),
                None => {
                    let srv = self
                        .server_opener
                        .open(Arc::clone(&plan.target), &scheme)
                        .await
                        .map_err(|source| ManagerError::ServerOpen {
                            scheme: scheme.clone(),
                            source,
                        })?;
                    by_scheme.insert(scheme, Arc::clone(&srv));
                    srv
                }
            };
            svc.bind_server(srv);

            if must_fork {
                // The forked child registers it under its own root.
                continue;
            }

            let reg_opts = match &self.root {
                Some(root) => {
                    RegisterOptions::new().with_edge_to(root.id(), EDGE_NODE, HashMap::new())
                }
                None => RegisterOptions::new(),
            };
            plan.target
                .register(ServiceItem::item(Arc::clone(&svc)), reg_opts)
                .await?;
            self.services.insert(svc.id().to_string(), svc);
        }

        for srv in by_scheme.into_values() {
            if let Some(root) = &self.root {
                let _ = plan
                    .target
                    .register_edge(root.id(), srv.id(), EDGE_NODE, HashMap::new())
                    .await;
            }
            self.servers.insert(srv.id().to_string(), srv);
        }

        Ok(())
    }
}
