//! # Server capability and serve options.
//!
//! A [`Server`] is a transport endpoint classified by a *scheme* string
//! ("grpc", "http", …). The manager keeps at most one server per scheme and
//! multiplexes every service speaking that scheme onto it.
//!
//! [`ServeOptions`] carry the per-service before/after hooks a server runs
//! around its accept loop, plus the error callback `serve_all` reports
//! aggregate start failures through.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{ManagerError, ServeError};
use crate::registry::{RegistryRef, Status};

/// Shared handle to a server.
pub type ServerRef = Arc<dyn Server>;

/// Async hook run by a server around its accept loop.
pub type ServeHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), ServeError>> + Send + Sync>;

/// Sink for aggregate `serve_all` failures.
pub type ErrorCallback = Arc<dyn Fn(&ManagerError) + Send + Sync>;

/// Options for [`Server::serve`].
///
/// Hooks accumulate in order: the manager merges one before/after pair per
/// service sharing the server.
#[derive(Clone, Default)]
pub struct ServeOptions {
    before: Vec<ServeHook>,
    after: Vec<ServeHook>,
    /// Invoked at most once per `serve_all` with the combined error.
    pub error_callback: Option<ErrorCallback>,
}

impl ServeOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook to run before the accept loop comes up.
    pub fn with_before_serve(mut self, hook: ServeHook) -> Self {
        self.before.push(hook);
        self
    }

    /// Appends a hook to run once the accept loop is up.
    pub fn with_after_serve(mut self, hook: ServeHook) -> Self {
        self.after.push(hook);
        self
    }

    /// Sets the aggregate error sink for `serve_all`.
    pub fn with_error_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&ManagerError) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(f));
        self
    }

    /// Appends another option set's hooks; an already-set error callback
    /// wins over the other's.
    pub fn merge(mut self, other: ServeOptions) -> Self {
        self.before.extend(other.before);
        self.after.extend(other.after);
        if self.error_callback.is_none() {
            self.error_callback = other.error_callback;
        }
        self
    }

    /// Runs the before-serve hooks in order, stopping at the first error.
    pub async fn run_before(&self) -> Result<(), ServeError> {
        for hook in &self.before {
            hook().await?;
        }
        Ok(())
    }

    /// Runs the after-serve hooks in order, stopping at the first error.
    pub async fn run_after(&self) -> Result<(), ServeError> {
        for hook in &self.after {
            hook().await?;
        }
        Ok(())
    }
}

/// Options for [`Server::stop`] and [`Service::stop`](crate::service::Service::stop).
///
/// Carried through to the registry deregistrations a backend performs while
/// shutting down.
#[derive(Clone, Debug, Default)]
pub struct StopOptions {
    /// Cascade registry removal through the stopped item's edges.
    pub deregister_full: bool,
    /// Fail on the first registry error instead of best-effort cleanup.
    pub fail_fast: bool,
}

impl StopOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cascading registry removal.
    pub fn with_deregister_full(mut self) -> Self {
        self.deregister_full = true;
        self
    }

    /// Requests fail-fast registry cleanup.
    pub fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }
}

/// # Transport server capability.
///
/// Implementations bring a listener up in `serve`, run the option hooks
/// around it, and tear it down in `stop`. `serve` either returns once the
/// transport is up (after the after-serve hooks) or blocks for the server's
/// lifetime, backend's choice; the manager treats it as a suspension point
/// either way.
#[async_trait]
pub trait Server: Send + Sync {
    /// Opaque, fleet-unique id.
    fn id(&self) -> &str;

    /// Registry name; defaults to the id.
    fn name(&self) -> &str {
        self.id()
    }

    /// The transport scheme this server speaks.
    fn scheme(&self) -> &str;

    /// Brings the transport up, running `opts` hooks around it.
    async fn serve(&self, opts: ServeOptions) -> Result<(), ServeError>;

    /// Tears the transport down.
    async fn stop(&self, opts: StopOptions) -> Result<(), ServeError>;

    /// Current lifecycle status.
    fn status(&self) -> Status;

    /// True when the server is in the given status.
    fn is(&self, status: Status) -> bool {
        self.status() == status
    }

    /// True when a newly attached service requires the accept loop to be
    /// re-initialized before it can participate.
    fn needs_restart(&self) -> bool;
}

/// Opens servers by transport scheme.
///
/// Planning resolves at most one server per scheme through this seam; the
/// shared registry is passed so backends can register themselves while
/// serving.
#[async_trait]
pub trait ServerOpener: Send + Sync {
    /// Opens a fresh server for `scheme`.
    async fn open(&self, registry: RegistryRef, scheme: &str) -> Result<ServerRef, ServeError>;
}
