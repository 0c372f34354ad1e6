use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Base subscriber that logs lifecycle events to stdout.
///
/// Useful as the default operator log and for debugging.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::RootAdopted => {
                println!("[root-adopted] node={:?}", e.server);
            }
            EventKind::RootCreated => {
                println!("[root-created] node={:?}", e.server);
            }
            EventKind::ServerStarting => {
                println!("[server-starting] server={:?} scheme={:?}", e.server, e.scheme);
            }
            EventKind::ServerRestarting => {
                println!(
                    "[server-restarting] server={:?} adopting service={:?}",
                    e.server, e.service
                );
            }
            EventKind::ServerStopped => {
                println!("[server-stopped] server={:?}", e.server);
            }
            EventKind::ServiceStarting => {
                println!("[service-starting] service={:?}", e.service);
            }
            EventKind::ServiceStopping => {
                println!("[service-stopping] service={:?}", e.service);
            }
            EventKind::UniqueDeferred => {
                println!(
                    "[unique-deferred] service={:?} already running elsewhere, watching registry",
                    e.service
                );
            }
            EventKind::UniqueTakeover => {
                println!("[unique-takeover] service={:?} err={:?}", e.service, e.error);
            }
            EventKind::ServeFailed => {
                println!("[serve-failed] err={:?}", e.error);
            }
            EventKind::StopFailed => {
                println!("[stop-failed] err={:?}", e.error);
            }
            EventKind::CommandReceived => {
                println!(
                    "[command] cmd={:?} item={:?}",
                    e.command,
                    e.service.as_ref().or(e.server.as_ref())
                );
            }
            EventKind::ConfigChanged => {
                println!("[config-restart] service={:?}", e.service);
            }
            EventKind::BrokerSubscribeFailed => {
                println!("[broker-subscribe-failed] err={:?}", e.error);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
