//! Embedded in-memory broker.
//!
//! Topic-keyed handler lists with single-delivery discipline: `publish`
//! awaits each handler in turn, so commands on one topic never interleave
//! within a delivery.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use super::{Broker, BrokerError, Message, MessageHandler, MessageRef, Subscription};

struct HandlerEntry {
    token: CancellationToken,
    handler: MessageHandler,
}

/// In-memory broker backend.
pub struct MemoryBroker {
    topics: DashMap<String, Vec<HandlerEntry>>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            topics: DashMap::new(),
        })
    }
}

struct RawMessage {
    data: HashMap<String, String>,
}

impl Message for RawMessage {
    fn raw_data(&self) -> HashMap<String, String> {
        self.data.clone()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn subscribe(
        &self,
        ctx: CancellationToken,
        topic: &str,
        handler: MessageHandler,
    ) -> Result<Subscription, BrokerError> {
        let token = ctx.child_token();
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push(HandlerEntry {
                token: token.clone(),
                handler,
            });
        Ok(Subscription::new(token))
    }

    async fn publish(
        &self,
        topic: &str,
        data: HashMap<String, String>,
    ) -> Result<(), BrokerError> {
        // Snapshot handlers and release the map entry before awaiting them.
        let handlers: Vec<MessageHandler> = {
            let Some(mut entry) = self.topics.get_mut(topic) else {
                return Ok(());
            };
            entry.retain(|h| !h.token.is_cancelled());
            entry.iter().map(|h| Arc::clone(&h.handler)).collect()
        };

        let msg: MessageRef = Arc::new(RawMessage { data });
        let mut first_err = None;
        for handler in handlers {
            if let Err(e) = handler(Arc::clone(&msg)).await {
                first_err.get_or_insert(BrokerError::Handler {
                    reason: e.to_string(),
                });
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
