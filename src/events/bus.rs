//! Delivery fan-out for manager lifecycle events.
//!
//! The manager is the only publisher, so [`Bus`] skips the usual
//! broadcast-channel indirection: it owns one bounded queue and one worker
//! task per [`Subscribe`]r, wired up once at build time. Publishing never
//! waits; a subscriber that falls behind (or whose worker died) loses
//! events for itself only, with a notice on stderr naming it.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::events::Event;
use crate::subscribers::Subscribe;

/// One subscriber's queue, tagged for drop notices.
struct Sink {
    name: &'static str,
    tx: mpsc::Sender<Event>,
}

/// Fans lifecycle events out to the subscribers given at construction.
///
/// Cheap to clone; every clone feeds the same subscriber queues. With no
/// subscribers, publishing is a no-op.
#[derive(Clone)]
pub struct Bus {
    sinks: Arc<[Sink]>,
}

impl Bus {
    /// Wires one bounded queue and worker task per subscriber.
    ///
    /// `capacity` bounds each subscriber's queue. Workers run until the
    /// bus (and with it their queue's sender) is dropped; a subscriber
    /// that panics takes down only its own worker.
    pub fn new(capacity: usize, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut sinks = Vec::with_capacity(subscribers.len());
        for sub in subscribers {
            let (tx, mut rx) = mpsc::channel::<Event>(capacity.max(1));
            let name = sub.name();
            tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    sub.on_event(&ev).await;
                }
            });
            sinks.push(Sink { name, tx });
        }
        Self {
            sinks: sinks.into(),
        }
    }

    /// Hands an event to every subscriber queue without waiting.
    ///
    /// Per-subscriber FIFO; no ordering across subscribers (each event
    /// carries a [`seq`](Event::seq) number for reconstructing one).
    pub fn publish(&self, ev: Event) {
        for sink in self.sinks.iter() {
            match sink.tx.try_send(ev.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    eprintln!(
                        "[runvisor] subscriber '{}' missed an event: queue full",
                        sink.name
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    eprintln!(
                        "[runvisor] subscriber '{}' missed an event: worker gone",
                        sink.name
                    );
                }
            }
        }
    }
}
