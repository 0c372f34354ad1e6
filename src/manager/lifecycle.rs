//! # Lifecycle engine.
//!
//! Starts and stops servers and services, enforcing the
//! restart-to-adopt-new-service rule:
//!
//! - `serve_all` starts every stopped server in parallel and returns
//!   immediately; aggregate failures reach the caller only through the
//!   serve options' error callback, invoked at most once
//! - `stop_all` stops services before their server, servers in parallel,
//!   then drops the root node from the registry
//! - `start_service` picks one of three paths: serve a stopped server,
//!   reboot a server that needs a restart (re-merging every running
//!   service's hooks), or attach directly to a running server

use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;

use crate::error::{ManagerError, ServeError};
use crate::events::{Event, EventKind};
use crate::registry::{RegisterOptions, Registry, Status};
use crate::server::{ServeHook, ServeOptions, Server, ServerRef, StopOptions};
use crate::service::{Service, ServiceRef};

use super::Manager;

impl Manager {
    /// Starts every retained server currently stopped.
    ///
    /// `opts` become the ambient serve options. Servers start in parallel;
    /// the call returns before any of them is ready. If any start fails and
    /// `opts` carried an error callback, it receives the combined error.
    pub fn serve_all(&self, opts: ServeOptions) {
        self.set_serve_options(opts.clone());

        let mut set = JoinSet::new();
        for srv in self.servers_with_status(Status::Stopped) {
            let m = self.handle();
            let o = opts.clone();
            set.spawn(async move { m.start_server(&srv, o).await });
        }

        let callback = opts.error_callback.clone();
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let mut reasons = Vec::new();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => reasons.push(e.to_string()),
                    Err(e) => reasons.push(format!("server task failed: {e}")),
                }
            }
            if !reasons.is_empty() {
                let err = ManagerError::ServeFailed { reasons };
                bus.publish(Event::now(EventKind::ServeFailed).with_error(err.to_string()));
                if let Some(cb) = callback {
                    cb(&err);
                }
            }
        });
    }

    /// Stops every retained server currently ready (services first, then
    /// the server; servers in parallel), then drops the root node from the
    /// registry.
    pub async fn stop_all(&self) {
        let mut set = JoinSet::new();
        for srv in self.servers_with_status(Status::Ready) {
            let m = self.handle();
            set.spawn(async move {
                m.stop_server(&srv, StopOptions::new().with_deregister_full())
                    .await
            });
        }

        let mut reasons = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => reasons.push(e.to_string()),
                Err(e) => reasons.push(format!("server task failed: {e}")),
            }
        }
        if !reasons.is_empty() {
            self.bus
                .publish(Event::now(EventKind::StopFailed).with_error(reasons.join("; ")));
        }

        if let Some(root) = &self.root {
            let _ = self
                .reg
                .deregister(Arc::clone(root), RegisterOptions::new().with_fail_fast())
                .await;
        }
    }

    /// Serves one server with the hooks of its attached services.
    ///
    /// A unique service whose name already runs elsewhere in the registry
    /// is skipped here; an arbiter task watches the registry and starts it
    /// once the incumbent vanishes.
    pub(crate) async fn start_server(
        &self,
        srv: &ServerRef,
        opts: ServeOptions,
    ) -> Result<(), ManagerError> {
        let mut merged = opts;
        for svc in self.services_on(srv) {
            if svc.options().unique && self.registry_running_service(svc.name()).await {
                self.bus
                    .publish(Event::now(EventKind::UniqueDeferred).with_service(svc.name()));
                let m = self.handle();
                tokio::spawn(async move { m.watch_unique_needs_start(svc).await });
                continue;
            }
            merged = merged.merge(self.service_serve_options(&svc));
        }

        self.bus.publish(
            Event::now(EventKind::ServerStarting)
                .with_server(srv.id())
                .with_scheme(srv.scheme()),
        );
        srv.serve(merged).await?;
        Ok(())
    }

    /// Stops every ready service on `srv` in parallel, then the server.
    ///
    /// The first service stop error is returned and the server is left
    /// running, matching the engine's no-retry policy.
    pub(crate) async fn stop_server(
        &self,
        srv: &ServerRef,
        opts: StopOptions,
    ) -> Result<(), ManagerError> {
        let mut set = JoinSet::new();
        for svc in self.services_running_on(srv) {
            let m = self.handle();
            let o = opts.clone();
            set.spawn(async move { m.stop_service(&svc, o).await });
        }

        let mut first: Option<ManagerError> = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first.get_or_insert(e);
                }
                Err(e) => {
                    first.get_or_insert(
                        ServeError::StopFailed {
                            id: srv.id().to_string(),
                            reason: format!("service stop task failed: {e}"),
                        }
                        .into(),
                    );
                }
            }
        }
        if let Some(e) = first {
            return Err(e);
        }

        srv.stop(opts).await?;
        self.bus
            .publish(Event::now(EventKind::ServerStopped).with_server(srv.id()));
        Ok(())
    }

    /// Starts a single service, used by the config watcher, the command
    /// subscriber, and the uniqueness arbiter.
    pub(crate) async fn start_service(&self, svc: &ServiceRef) -> Result<(), ManagerError> {
        let Some(srv) = svc.server() else {
            return Err(ManagerError::ServiceNotAttached {
                name: svc.name().to_string(),
            });
        };
        let serve_opts = self
            .ambient_serve_options()
            .merge(self.service_serve_options(svc));

        if srv.is(Status::Stopped) {
            // Server is not running, serve it with this service's hooks.
            self.bus.publish(
                Event::now(EventKind::ServerStarting)
                    .with_server(srv.id())
                    .with_scheme(srv.scheme()),
            );
            srv.serve(serve_opts).await?;
        } else if srv.needs_restart() {
            // Reboot the server so the new service joins its accept loop.
            self.bus.publish(
                Event::now(EventKind::ServerRestarting)
                    .with_server(srv.id())
                    .with_service(svc.name()),
            );
            let mut merged = serve_opts;
            for running in self.services_running_on(&srv) {
                merged = merged.merge(self.service_serve_options(&running));
            }
            self.stop_server(&srv, StopOptions::new()).await?;
            srv.serve(merged).await?;
        } else {
            // Attach to the running server without disturbing peers.
            self.bus
                .publish(Event::now(EventKind::ServiceStarting).with_service(svc.name()));
            svc.start().await?;
            svc.on_serve().await?;
        }

        Ok(())
    }

    /// Stops a single service.
    pub(crate) async fn stop_service(
        &self,
        svc: &ServiceRef,
        opts: StopOptions,
    ) -> Result<(), ManagerError> {
        self.bus
            .publish(Event::now(EventKind::ServiceStopping).with_service(svc.name()));
        svc.stop(opts).await?;
        Ok(())
    }

    /// The before/after serve hooks of one service.
    pub(crate) fn service_serve_options(&self, svc: &ServiceRef) -> ServeOptions {
        let before: ServeHook = {
            let s = Arc::clone(svc);
            Arc::new(move || {
                let s = Arc::clone(&s);
                async move { s.start().await }.boxed()
            })
        };
        let after: ServeHook = {
            let s = Arc::clone(svc);
            Arc::new(move || {
                let s = Arc::clone(&s);
                async move { s.on_serve().await }.boxed()
            })
        };
        ServeOptions::new()
            .with_before_serve(before)
            .with_after_serve(after)
    }

    /// Retained servers currently in the given status.
    pub(crate) fn servers_with_status(&self, status: Status) -> Vec<ServerRef> {
        self.servers
            .iter()
            .filter(|entry| entry.value().is(status))
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Retained services attached to `srv`, any status.
    pub(crate) fn services_on(&self, srv: &ServerRef) -> Vec<ServiceRef> {
        self.services
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .server()
                    .map(|s| s.id() == srv.id())
                    .unwrap_or(false)
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Retained services attached to `srv` and currently ready.
    pub(crate) fn services_running_on(&self, srv: &ServerRef) -> Vec<ServiceRef> {
        self.services
            .iter()
            .filter(|entry| {
                let svc = entry.value();
                svc.is(Status::Ready)
                    && svc.server().map(|s| s.id() == srv.id()).unwrap_or(false)
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
