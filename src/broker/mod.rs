//! # Broker capability.
//!
//! The broker delivers remote-control commands to the manager over the
//! [`TOPIC_REGISTRY_COMMAND`] topic. Handlers receive a small string-keyed
//! mapping (`command`, `itemName`); a handler error is surfaced to the
//! publisher so it may redeliver or deadletter, while `Ok(())` acknowledges
//! the message.

mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use memory::MemoryBroker;

/// Topic carrying start/stop/restart commands for registry items.
pub const TOPIC_REGISTRY_COMMAND: &str = "registry:command";

/// Shared handle to a broker message.
pub type MessageRef = Arc<dyn Message>;

/// Error type handlers may return; converted from any typed error.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Message handler invoked once per delivery.
pub type MessageHandler =
    Arc<dyn Fn(MessageRef) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// A delivered broker message.
pub trait Message: Send + Sync {
    /// The raw string-keyed payload.
    fn raw_data(&self) -> HashMap<String, String>;
}

/// # Errors produced by broker backends.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The subscription could not be established.
    #[error("broker subscribe failed on topic '{topic}': {reason}")]
    SubscribeFailed {
        /// The topic.
        topic: String,
        /// Backend-provided detail.
        reason: String,
    },

    /// A handler rejected a delivery.
    #[error("broker handler failed: {reason}")]
    Handler {
        /// The handler's error message.
        reason: String,
    },
}

impl BrokerError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::SubscribeFailed { .. } => "broker_subscribe_failed",
            BrokerError::Handler { .. } => "broker_handler",
        }
    }
}

/// Guard for an active subscription.
///
/// Dropping the guard does **not** detach the handler; the subscription
/// lives until [`Subscription::unsubscribe`] or the subscribing context is
/// cancelled.
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    /// Wraps the token a backend tied the handler's lifetime to.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Detaches the handler.
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }
}

/// # Broker capability.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Attaches `handler` to `topic`.
    ///
    /// The subscription's lifetime is tied to `ctx`: cancelling it detaches
    /// the handler.
    async fn subscribe(
        &self,
        ctx: CancellationToken,
        topic: &str,
        handler: MessageHandler,
    ) -> Result<Subscription, BrokerError>;

    /// Publishes one message, delivering it to every attached handler.
    ///
    /// The first handler error is returned to the publisher.
    async fn publish(
        &self,
        topic: &str,
        data: HashMap<String, String>,
    ) -> Result<(), BrokerError>;
}
