//! # runvisor
//!
//! **Runvisor** is a service runtime supervisor.
//!
//! It owns a process's in-memory **services** and their backing
//! **servers**, multiplexes many services onto one server per transport
//! scheme, and keeps that lifecycle in sync with a shared **registry**, a
//! **configuration watch**, and a **broker** command topic, including
//! fork-aware bootstrap and fleet-wide uniqueness arbitration.
//!
//! ## Features
//!
//! | Area               | Description                                                        | Key types / traits                          |
//! |--------------------|--------------------------------------------------------------------|---------------------------------------------|
//! | **Manager**        | Plan, serve, stop, and remotely control services and servers.      | [`Manager`], [`ManagerBuilder`]             |
//! | **Registry**       | Shared item store with edges, filters, and watch streams.          | [`Registry`], [`RegistryItem`], [`Watch`]   |
//! | **Capabilities**   | Seams for servers, services, brokers, and config stores.           | [`Server`], [`Service`], [`Broker`], [`ConfigStore`] |
//! | **Observability**  | Typed lifecycle events fanned out to subscribers.                  | [`Event`], [`Subscribe`], [`LogWriter`]     |
//! | **Arbitration**    | At-most-one running instance of *unique* services fleet-wide.      | [`Debounce`], [`ServiceOptions::unique`]    |
//! | **Errors**         | Typed errors per failure domain.                                   | [`ManagerError`], [`RegistryError`]         |
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use runvisor::{LogWriter, Manager, MemoryRegistry, Runtime, ServeOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The shared registry sibling processes also observe.
//!     let registry = MemoryRegistry::new();
//!
//!     let manager = Manager::builder(registry, "mem://services", Runtime::new("main"))
//!         .with_subscribers(vec![Arc::new(LogWriter)])
//!         .build()
//!         .await;
//!
//!     manager.init(CancellationToken::new()).await?;
//!     manager.serve_all(
//!         ServeOptions::new().with_error_callback(|e| eprintln!("serve failed: {e}")),
//!     );
//!     // ... run until shutdown ...
//!     manager.stop_all().await;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod debounce;
mod error;
mod runtime;
mod server;
mod service;

pub mod broker;
pub mod conf;
pub mod events;
pub mod manager;
pub mod registry;
pub mod subscribers;

// ---- Public re-exports ----

pub use broker::{
    Broker, BrokerError, HandlerError, MemoryBroker, Message, MessageHandler, MessageRef,
    Subscription, TOPIC_REGISTRY_COMMAND,
};
pub use conf::{ConfigError, ConfigStore, KeyValue, MemoryConfig};
pub use config::ManagerConfig;
pub use debounce::Debounce;
pub use error::{ManagerError, RegistryError, ServeError};
pub use events::{Bus, Event, EventKind};
pub use manager::{
    Manager, ManagerBuilder, PlanContext, COMMAND_RESTART, COMMAND_START, COMMAND_STOP,
};
pub use registry::{
    ActionKind, Edge, ItemFilter, ItemInfo, ItemKind, ItemRef, MemoryOpener, MemoryRegistry,
    RegisterOptions, Registry, RegistryEvent, RegistryItem, RegistryOpener, RegistryRef,
    ServerItem, ServiceItem, Status, Watch, WatchStopper, EDGE_FORK, EDGE_NODE, META_STATUS,
    NODE_META_PID,
};
pub use runtime::{Runtime, FORK_ENV};
pub use server::{
    ErrorCallback, ServeHook, ServeOptions, Server, ServerOpener, ServerRef, StopOptions,
};
pub use service::{Service, ServiceOptions, ServiceRef};
pub use subscribers::{LogWriter, Subscribe};
