//! # Uniqueness arbiter.
//!
//! Spawned when a *unique* service cannot start because the registry shows
//! another non-stopped instance by that name. The arbiter watches the
//! registry for changes on the name, debounces bursts of transitional
//! events, and re-queries against a settled view before taking over.
//!
//! The arbiter has no external cancel channel: it exits on watch error and
//! stops its own watch after a successful takeover, so no task leaks.

use std::sync::Arc;

use crate::debounce::Debounce;
use crate::events::{Event, EventKind};
use crate::registry::{
    ActionKind, ItemFilter, ItemKind, Registry, RegistryItem, Status, META_STATUS,
};
use crate::service::{Service, ServiceRef};

use super::Manager;

impl Manager {
    /// True when the shared registry shows any non-stopped instance of the
    /// named service.
    ///
    /// An instance without a status metadata key counts as non-stopped;
    /// live adapters always publish one, so this only affects bare
    /// projections.
    pub(crate) async fn registry_running_service(&self, name: &str) -> bool {
        let Ok(items) = self
            .reg
            .list(ItemFilter::new().kind(ItemKind::Service).name(name))
            .await
        else {
            return false;
        };
        items.iter().any(|item| {
            item.metadata()
                .get(META_STATUS)
                .map(|status| status != Status::Stopped.as_str())
                .unwrap_or(true)
        })
    }

    /// Watches the registry until the incumbent of a unique service
    /// vanishes, then takes over.
    pub(crate) async fn watch_unique_needs_start(self: Arc<Self>, svc: ServiceRef) {
        let gate = Debounce::new(self.cfg.unique_debounce);
        let filter = ItemFilter::new()
            .kind(ItemKind::Service)
            .name(svc.name())
            .action(ActionKind::Any);
        let Ok(mut watch) = self.reg.watch(filter).await else {
            return;
        };
        let stopper = watch.stopper();

        loop {
            if watch.next().await.is_err() {
                break;
            }
            let m = Arc::clone(&self);
            let svc = Arc::clone(&svc);
            let stopper = stopper.clone();
            gate.call(async move {
                // Re-query against a settled view; the quiet window has
                // passed since the last event.
                if m.registry_running_service(svc.name()).await {
                    return;
                }
                match m.start_service(&svc).await {
                    Ok(()) => {
                        m.bus
                            .publish(Event::now(EventKind::UniqueTakeover).with_service(svc.name()));
                        stopper.stop();
                    }
                    Err(e) => {
                        // Stay subscribed; a later event gets another try.
                        m.bus.publish(
                            Event::now(EventKind::UniqueTakeover)
                                .with_service(svc.name())
                                .with_error(e.to_string()),
                        );
                    }
                }
            });
        }
    }
}
