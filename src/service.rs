//! # Service capability.
//!
//! A [`Service`] is a named unit of work that co-hosts with its peers on
//! the server speaking its scheme. Its [`ServiceOptions`] flags drive
//! planning (tags, fork, force-register) and runtime behavior (unique,
//! auto-restart).

use std::sync::Arc;

use async_trait::async_trait;

use crate::registry::Status;
use crate::server::{ServerRef, StopOptions};

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// Planning and runtime flags of a service.
#[derive(Clone, Debug, Default)]
pub struct ServiceOptions {
    /// Tags matched against the namespace's required set during planning.
    pub tags: Vec<String>,
    /// The service runs in a forked child process, not in the parent.
    pub fork: bool,
    /// Start the service as soon as its server serves.
    pub auto_start: bool,
    /// Retain the service even when its tags are not required.
    pub force_register: bool,
    /// At most one running instance fleet-wide.
    pub unique: bool,
    /// Restart automatically when the service's config key changes.
    pub auto_restart: bool,
}

impl ServiceOptions {
    /// Creates default options (no tags, no flags).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the planning tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the service as fork-only.
    pub fn with_fork(mut self, fork: bool) -> Self {
        self.fork = fork;
        self
    }

    /// Marks the service as auto-starting.
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Retains the service regardless of tag filtering.
    pub fn with_force_register(mut self, force: bool) -> Self {
        self.force_register = force;
        self
    }

    /// Enforces at-most-one running instance fleet-wide.
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Restarts the service on configuration changes.
    pub fn with_auto_restart(mut self, auto_restart: bool) -> Self {
        self.auto_restart = auto_restart;
        self
    }
}

/// # Logical service capability.
///
/// A service is either attached to exactly one server (bound during
/// planning) or unattached. `start`/`on_serve` run from its server's
/// before/after serve hooks, or directly when the service joins an
/// already-running server.
#[async_trait]
pub trait Service: Send + Sync {
    /// Opaque, fleet-unique id.
    fn id(&self) -> &str;

    /// Name; services are commanded and arbitrated by name.
    fn name(&self) -> &str;

    /// The transport scheme of the server this service needs.
    fn server_scheme(&self) -> &str;

    /// A snapshot of the service's option flags.
    fn options(&self) -> ServiceOptions;

    /// The server this service was bound to during planning, if any.
    fn server(&self) -> Option<ServerRef>;

    /// Binds the resolved per-scheme server.
    fn bind_server(&self, server: ServerRef);

    /// Starts the unit of work.
    async fn start(&self) -> Result<(), crate::error::ServeError>;

    /// Stops the unit of work.
    async fn stop(&self, opts: StopOptions) -> Result<(), crate::error::ServeError>;

    /// Called once the owning server's accept loop is up.
    async fn on_serve(&self) -> Result<(), crate::error::ServeError>;

    /// Current lifecycle status.
    fn status(&self) -> Status;

    /// True when the service is in the given status.
    fn is(&self, status: Status) -> bool {
        self.status() == status
    }
}
