//! Key-value store port and the persistent queue snapshot built on it.

use crate::{OutboxResult, QueuedRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key under which the whole queue snapshot is stored.
pub const QUEUE_KEY: &str = "failedRequestQueue";

/// Durable string key-value store.
///
/// Each `set_item` replaces the previous value for the key as a whole.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value, `None` if the key was never written.
    async fn get_item(&self, key: &str) -> OutboxResult<Option<String>>;

    /// Overwrite a value.
    async fn set_item(&self, key: &str, value: &str) -> OutboxResult<()>;
}

/// In-process store, used by tests and short-lived tools.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> OutboxResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> OutboxResult<()> {
        self.data.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The persisted queue: an ordered list of pending requests serialized as one
/// JSON array under [`QUEUE_KEY`].
#[derive(Clone)]
pub struct QueueStore {
    kv: Arc<dyn KeyValueStore>,
}

impl QueueStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Read the current snapshot.
    ///
    /// Fails only when the store itself cannot be read. An absent key and an
    /// unparsable value both yield an empty queue.
    pub async fn read(&self) -> OutboxResult<Vec<QueuedRequest>> {
        let Some(raw) = self.kv.get_item(QUEUE_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<QueuedRequest>>(&raw) {
            Ok(queue) => Ok(queue),
            Err(e) => {
                warn!(key = QUEUE_KEY, error = %e, "Stored queue is unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Read the current snapshot, treating any failure as an empty queue.
    pub async fn load(&self) -> Vec<QueuedRequest> {
        match self.read().await {
            Ok(queue) => queue,
            Err(e) => {
                warn!(key = QUEUE_KEY, error = %e, "Queue store unavailable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replace the stored snapshot with `queue`.
    pub async fn save(&self, queue: &[QueuedRequest]) -> OutboxResult<()> {
        let raw = serde_json::to_string(queue)?;
        self.kv.set_item(QUEUE_KEY, &raw).await?;
        debug!(key = QUEUE_KEY, count = queue.len(), "Saved queue snapshot");
        Ok(())
    }
}
