//! # Error types used by the manager and its capabilities.
//!
//! Three enums cover the three failure domains:
//!
//! - [`ManagerError`] errors raised by the orchestration layer itself.
//! - [`RegistryError`] errors raised by a registry backend.
//! - [`ServeError`] errors raised by server and service operations.
//!
//! All types provide an `as_label` helper returning a short stable
//! snake_case string for logs and metrics.

use thiserror::Error;

/// # Errors produced by the manager's orchestration layer.
///
/// Setup errors (`SourceRegistryOpen`, `ServerOpen`) abort `init`;
/// operation errors are reported upward without tearing the manager down.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ManagerError {
    /// The source registry at the configured URL could not be opened.
    #[error("cannot open source registry '{url}': {source}")]
    SourceRegistryOpen {
        /// The source registry URL.
        url: String,
        #[source]
        source: RegistryError,
    },

    /// A server for a transport scheme could not be opened during planning.
    #[error("cannot open server for scheme '{scheme}': {source}")]
    ServerOpen {
        /// The transport scheme a service asked for.
        scheme: String,
        #[source]
        source: ServeError,
    },

    /// A registry call failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A server or service operation failed.
    #[error(transparent)]
    Serve(#[from] ServeError),

    /// One or more servers failed while being started by `serve_all`.
    #[error("serve failed: {}", reasons.join("; "))]
    ServeFailed {
        /// One message per failed server start.
        reasons: Vec<String>,
    },

    /// A service has no server bound, so it cannot be started.
    #[error("service '{name}' is not attached to any server")]
    ServiceNotAttached {
        /// The unattached service name.
        name: String,
    },

    /// A broker command carried a verb outside {start, stop, restart}.
    #[error("unsupported command {command}")]
    UnsupportedCommand {
        /// The offending command string.
        command: String,
    },

    /// The operation was aborted by context cancellation.
    #[error("operation canceled")]
    Canceled,
}

impl ManagerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ManagerError::SourceRegistryOpen { .. } => "manager_source_registry_open",
            ManagerError::ServerOpen { .. } => "manager_server_open",
            ManagerError::Registry(_) => "manager_registry",
            ManagerError::Serve(_) => "manager_serve",
            ManagerError::ServeFailed { .. } => "manager_serve_failed",
            ManagerError::ServiceNotAttached { .. } => "manager_service_not_attached",
            ManagerError::UnsupportedCommand { .. } => "manager_unsupported_command",
            ManagerError::Canceled => "manager_canceled",
        }
    }
}

/// # Errors produced by registry backends.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No item with the requested name (and filters) exists.
    #[error("item '{name}' not found in registry")]
    NotFound {
        /// The requested item name.
        name: String,
    },

    /// No backend knows how to open the given URL.
    #[error("no registry backend for url '{url}'")]
    UnknownUrl {
        /// The unresolvable URL.
        url: String,
    },

    /// A watch stream ended, either stopped by its owner or closed by the backend.
    #[error("registry watch closed")]
    WatchClosed,

    /// The backend rejected or failed the call.
    #[error("registry backend error: {reason}")]
    Backend {
        /// Backend-provided detail.
        reason: String,
    },
}

impl RegistryError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "registry_not_found",
            RegistryError::UnknownUrl { .. } => "registry_unknown_url",
            RegistryError::WatchClosed => "registry_watch_closed",
            RegistryError::Backend { .. } => "registry_backend",
        }
    }

    /// True for the silent-acknowledge case of broker command resolution.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}

/// # Errors produced by server and service operations.
///
/// Raised by `Server::serve`/`Server::stop`, `Service::start`/`Service::stop`/
/// `Service::on_serve`, and the before/after serve hooks.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServeError {
    /// A server for the scheme could not be opened.
    #[error("open failed for scheme '{scheme}': {reason}")]
    OpenFailed {
        /// The transport scheme.
        scheme: String,
        /// Backend-provided detail.
        reason: String,
    },

    /// The server failed to bring its transport up or lost it while serving.
    #[error("serve failed on '{id}': {reason}")]
    ServeFailed {
        /// The server id.
        id: String,
        /// Backend-provided detail.
        reason: String,
    },

    /// A stop request failed.
    #[error("stop failed on '{id}': {reason}")]
    StopFailed {
        /// The server or service id.
        id: String,
        /// Backend-provided detail.
        reason: String,
    },

    /// A service start, stop, or on-serve callback failed.
    #[error("service '{name}' failed: {reason}")]
    ServiceFailed {
        /// The service name.
        name: String,
        /// Detail from the service.
        reason: String,
    },
}

impl ServeError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServeError::OpenFailed { .. } => "serve_open_failed",
            ServeError::ServeFailed { .. } => "serve_serve_failed",
            ServeError::StopFailed { .. } => "serve_stop_failed",
            ServeError::ServiceFailed { .. } => "serve_service_failed",
        }
    }
}
