//! # Configuration store capability.
//!
//! The manager only consumes one surface of the configuration system: a
//! map-valued watch over the `services` subtree. Each emitted [`KeyValue`]
//! names a service whose configuration changed; services opting into
//! auto-restart are bounced by the config watcher.

mod memory;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::MemoryConfig;

/// One changed key under a watched subtree.
#[derive(Clone, Debug)]
pub struct KeyValue {
    /// The changed key (a service name under the `services` subtree).
    pub key: String,
    /// The new raw value.
    pub value: String,
}

/// # Errors produced by configuration backends.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The watch could not be established.
    #[error("config watch failed on '{path}': {reason}")]
    WatchFailed {
        /// The watched subtree.
        path: String,
        /// Backend-provided detail.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::WatchFailed { .. } => "config_watch_failed",
        }
    }
}

/// # Configuration store capability.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Opens a map-valued watch over the given subtree.
    ///
    /// The stream ends when the backend drops its sender.
    async fn watch_map(&self, path: &str) -> Result<mpsc::Receiver<KeyValue>, ConfigError>;
}
