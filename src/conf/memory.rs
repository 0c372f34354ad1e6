//! Embedded in-memory configuration store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConfigError, ConfigStore, KeyValue};

const WATCH_BUFFER: usize = 32;

/// In-memory config backend: `set` fans changed keys out to every watcher
/// of the matching subtree.
pub struct MemoryConfig {
    watchers: Mutex<Vec<(String, mpsc::Sender<KeyValue>)>>,
}

impl MemoryConfig {
    /// Creates an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            watchers: Mutex::new(Vec::new()),
        })
    }

    /// Sets a key under a subtree and notifies its watchers.
    pub async fn set(&self, path: &str, key: impl Into<String>, value: impl Into<String>) {
        let kv = KeyValue {
            key: key.into(),
            value: value.into(),
        };
        // Snapshot senders outside the lock before awaiting.
        let senders: Vec<mpsc::Sender<KeyValue>> = {
            let mut watchers = self.watchers.lock().expect("watcher lock poisoned");
            watchers.retain(|(_, tx)| !tx.is_closed());
            watchers
                .iter()
                .filter(|(p, _)| p == path)
                .map(|(_, tx)| tx.clone())
                .collect()
        };
        for tx in senders {
            let _ = tx.send(kv.clone()).await;
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfig {
    async fn watch_map(&self, path: &str) -> Result<mpsc::Receiver<KeyValue>, ConfigError> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        self.watchers
            .lock()
            .expect("watcher lock poisoned")
            .push((path.to_string(), tx));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_reaches_matching_watchers_only() {
        let conf = MemoryConfig::new();
        let mut services = conf.watch_map("services").await.unwrap();
        let mut other = conf.watch_map("other").await.unwrap();

        conf.set("services", "search", "{}").await;

        let kv = services.recv().await.unwrap();
        assert_eq!(kv.key, "search");
        assert!(other.try_recv().is_err());
    }
}
