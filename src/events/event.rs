//! # Lifecycle events emitted by the manager.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Topology events**: root node creation/adoption during bootstrap
//! - **Lifecycle events**: server and service start/stop decisions
//! - **Arbitration events**: unique-service deferral and takeover
//! - **Control events**: broker commands and configuration changes
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! service/server names, the command verb, and error messages.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, so events can be ordered correctly even when delivered
//! out-of-order through async channels.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of manager lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Topology events ===
    /// An existing root node for this process was adopted from the registry.
    RootAdopted,
    /// A fresh root node was created and registered.
    RootCreated,

    // === Server lifecycle events ===
    /// A server is being started.
    ServerStarting,
    /// A running server is being rebooted to adopt a newly attached service.
    ServerRestarting,
    /// A server was stopped.
    ServerStopped,

    // === Service lifecycle events ===
    /// A service is being started on an already-running server.
    ServiceStarting,
    /// A service is being stopped.
    ServiceStopping,

    // === Uniqueness arbitration events ===
    /// A unique service has a running incumbent elsewhere; start deferred.
    UniqueDeferred,
    /// The incumbent vanished; the deferred unique service is taking over.
    UniqueTakeover,

    // === Aggregate failures ===
    /// One or more servers failed to start during `serve_all`.
    ServeFailed,
    /// One or more servers failed to stop during `stop_all`.
    StopFailed,

    // === Control events ===
    /// A command was received on the broker's command topic.
    CommandReceived,
    /// A configuration change triggered an auto-restart.
    ConfigChanged,
    /// The broker subscription could not be established.
    BrokerSubscribeFailed,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Name of the service involved, if applicable.
    pub service: Option<String>,
    /// Id or name of the server involved, if applicable.
    pub server: Option<String>,
    /// Transport scheme, if applicable.
    pub scheme: Option<String>,
    /// Broker command verb, if applicable.
    pub command: Option<String>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            server: None,
            scheme: None,
            command: None,
            error: None,
        }
    }

    /// Attaches a service name.
    pub fn with_service(mut self, name: impl Into<String>) -> Self {
        self.service = Some(name.into());
        self
    }

    /// Attaches a server id or name.
    pub fn with_server(mut self, id: impl Into<String>) -> Self {
        self.server = Some(id.into());
        self
    }

    /// Attaches a transport scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Attaches a broker command verb.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }
}
