//! # Watch streams over registry changes.
//!
//! A [`Watch`] yields [`RegistryEvent`]s matching the filter it was opened
//! with. It can be stopped from the consuming loop or, through a cloned
//! [`WatchStopper`], from another task: the uniqueness arbiter stops its
//! own watch from inside a debounced critical section after a successful
//! takeover.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::RegistryError;
use crate::registry::filter::ActionKind;
use crate::registry::item::ItemRef;

/// One observed registry change.
#[derive(Clone)]
pub struct RegistryEvent {
    /// What happened.
    pub action: ActionKind,
    /// The item the change applies to.
    pub item: ItemRef,
}

/// A stoppable stream of registry events.
pub struct Watch {
    rx: mpsc::Receiver<RegistryEvent>,
    cancel: CancellationToken,
}

impl Watch {
    /// Builds a watch over a backend-fed channel and its stop token.
    ///
    /// Backends are expected to stop feeding `rx` once `cancel` fires.
    pub fn new(rx: mpsc::Receiver<RegistryEvent>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Awaits the next event.
    ///
    /// Returns [`RegistryError::WatchClosed`] once the watch was stopped or
    /// the backend closed the stream.
    pub async fn next(&mut self) -> Result<RegistryEvent, RegistryError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(RegistryError::WatchClosed),
            ev = self.rx.recv() => ev.ok_or(RegistryError::WatchClosed),
        }
    }

    /// Stops the watch; pending and future `next` calls return
    /// [`RegistryError::WatchClosed`].
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Returns a handle that can stop this watch from another task.
    pub fn stopper(&self) -> WatchStopper {
        WatchStopper(self.cancel.clone())
    }
}

/// Clonable remote stop handle for a [`Watch`].
#[derive(Clone)]
pub struct WatchStopper(CancellationToken);

impl WatchStopper {
    /// Stops the associated watch.
    pub fn stop(&self) {
        self.0.cancel();
    }
}
