//! # Reactive watchers: configuration changes and broker commands.
//!
//! - The config watcher restarts services whose key under the `services`
//!   subtree changed, when they opt into auto-restart. A failed stop aborts
//!   the restart for that event (no double-start).
//! - The command subscriber consumes `{command, itemName}` messages from
//!   the broker's command topic and dispatches start/stop/restart to the
//!   lifecycle engine. Unknown items are acknowledged silently to avoid
//!   feedback loops against stale publishers; unknown verbs error back to
//!   the broker.

use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::broker::{
    Broker, BrokerError, HandlerError, MessageHandler, MessageRef, Subscription,
    TOPIC_REGISTRY_COMMAND,
};
use crate::conf::ConfigStore;
use crate::error::ManagerError;
use crate::events::{Event, EventKind};
use crate::registry::{ItemFilter, ItemKind, Registry, RegistryItem};
use crate::server::StopOptions;
use crate::service::Service;

use super::{Manager, COMMAND_RESTART, COMMAND_START, COMMAND_STOP};

impl Manager {
    /// Spawns the configuration watcher over the `services` subtree.
    ///
    /// Each emitted key names a service; if the shared registry resolves it
    /// and its auto-restart flag is set, the service is stopped and started
    /// again. The task ends when the watch stream closes.
    pub fn watch_services_configs(&self, store: Arc<dyn ConfigStore>) {
        let m = self.handle();
        tokio::spawn(async move {
            let Ok(mut stream) = store.watch_map("services").await else {
                return;
            };
            while let Some(kv) = stream.recv().await {
                let Ok(items) = m.reg.list(ItemFilter::new().name(&kv.key)).await else {
                    continue;
                };
                let Some(item) = items.into_iter().next() else {
                    continue;
                };
                let Some(svc) = item.as_service() else {
                    continue;
                };
                if !svc.options().auto_restart {
                    continue;
                }
                m.bus
                    .publish(Event::now(EventKind::ConfigChanged).with_service(svc.name()));
                if m.stop_service(&svc, StopOptions::new()).await.is_ok() {
                    let _ = m.start_service(&svc).await;
                }
            }
        });
    }

    /// Subscribes to the broker's command topic.
    ///
    /// The subscription lives until `ctx` is cancelled or the returned
    /// guard is unsubscribed. A subscribe failure is published on the bus
    /// and returned.
    pub async fn watch_broker(
        &self,
        ctx: CancellationToken,
        broker: Arc<dyn Broker>,
    ) -> Result<Subscription, BrokerError> {
        let m = self.handle();
        let handler: MessageHandler = Arc::new(move |msg: MessageRef| {
            let m = Arc::clone(&m);
            async move { m.handle_command(msg).await }.boxed()
        });

        match broker.subscribe(ctx, TOPIC_REGISTRY_COMMAND, handler).await {
            Ok(sub) => Ok(sub),
            Err(e) => {
                self.bus.publish(
                    Event::now(EventKind::BrokerSubscribeFailed).with_error(e.to_string()),
                );
                Err(e)
            }
        }
    }

    /// Resolves and dispatches one broker command.
    async fn handle_command(&self, msg: MessageRef) -> Result<(), HandlerError> {
        let data = msg.raw_data();
        let command = data.get("command").cloned().unwrap_or_default();
        let item_name = data.get("itemName").cloned().unwrap_or_default();
        self.bus.publish(
            Event::now(EventKind::CommandReceived)
                .with_command(&command)
                .with_service(&item_name),
        );

        let item = match self
            .reg
            .get(
                &item_name,
                ItemFilter::new().kind(ItemKind::Server).kind(ItemKind::Service),
            )
            .await
        {
            Ok(item) => item,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // Prefer the live handle the item may carry; fall back to the
        // local maps when only a projection came back.
        let mut svc = item.as_service();
        let mut srv = item.as_server();
        if svc.is_none() && srv.is_none() {
            match item.kind() {
                ItemKind::Service => {
                    svc = self.services.get(item.id()).map(|e| Arc::clone(e.value()));
                }
                ItemKind::Server => {
                    srv = self.servers.get(item.id()).map(|e| Arc::clone(e.value()));
                }
                _ => {}
            }
        }

        if let Some(svc) = svc {
            match command.as_str() {
                COMMAND_START => self.start_service(&svc).await?,
                COMMAND_STOP => self.stop_service(&svc, StopOptions::new()).await?,
                COMMAND_RESTART => {
                    self.stop_service(&svc, StopOptions::new()).await?;
                    self.start_service(&svc).await?;
                }
                other => {
                    return Err(ManagerError::UnsupportedCommand {
                        command: other.to_string(),
                    }
                    .into())
                }
            }
        } else if let Some(srv) = srv {
            let ambient = self.ambient_serve_options();
            match command.as_str() {
                COMMAND_START => self.start_server(&srv, ambient).await?,
                COMMAND_STOP => self.stop_server(&srv, StopOptions::new()).await?,
                COMMAND_RESTART => {
                    self.stop_server(&srv, StopOptions::new()).await?;
                    self.start_server(&srv, ambient).await?;
                }
                other => {
                    return Err(ManagerError::UnsupportedCommand {
                        command: other.to_string(),
                    }
                    .into())
                }
            }
        }

        Ok(())
    }
}
