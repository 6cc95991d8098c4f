//! Test harness for queue and submission scenarios.
//!
//! Provides:
//! - MockTransport: scripted replies and call recording
//! - FlakyStore: an in-memory store with read/write failure injection
//! - TestHarness: wires both into an OfflineQueue and a Submitter

use crate::{
    ActivityLog, HttpTransport, KeyValueStore, LogBook, MemoryStore, OfflineQueue,
    OutboundRequest, OutboxError, OutboxResult, QueueStore, QueuedRequest, Submitter,
    SubmitterConfig, TransportResponse, QUEUE_KEY,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use parking_lot::Mutex;
use std::sync::Arc;

pub const BASE_URL: &str = "https://x";
pub const QR_URL: &str = "https://x/api/qr";
pub const LOCATIONS_URL: &str = "https://x/api/locations";
/// `Authorization` value the harness submitter sends (`test:test`).
pub const AUTHORIZATION: &str = "Basic dGVzdDp0ZXN0";

/// Scripted outcome of one transport call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Completed exchange with this status and body.
    Status(u16, String),
    /// Transport-level failure with this detail.
    NetworkError(String),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status(200, "ok".to_string())
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply::Status(status, body.to_string())
    }

    pub fn offline() -> Self {
        Reply::NetworkError("Network request failed".to_string())
    }
}

/// Transport that answers from a script and records every request.
pub struct MockTransport {
    calls: Mutex<Vec<OutboundRequest>>,
    replies: Mutex<VecDeque<Reply>>,
    default_reply: Mutex<Reply>,
}

impl MockTransport {
    /// Create a transport answering 200 unless scripted otherwise.
    pub fn new() -> Self {
        Self::with_default(Reply::ok())
    }

    pub fn with_default(reply: Reply) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            default_reply: Mutex::new(reply),
        }
    }

    /// Queue a reply for the next unscripted call.
    pub fn push_reply(&self, reply: Reply) {
        self.replies.lock().push_back(reply);
    }

    pub fn set_default(&self, reply: Reply) {
        *self.default_reply.lock() = reply;
    }

    pub fn calls(&self) -> Vec<OutboundRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn called_urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &OutboundRequest) -> OutboxResult<TransportResponse> {
        self.calls.lock().push(request.clone());

        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.lock().clone());

        match reply {
            Reply::Status(status, body) => Ok(TransportResponse::new(status, body)),
            Reply::NetworkError(detail) => Err(OutboxError::Transport(detail)),
        }
    }
}

/// In-memory store whose reads and writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    /// Raw stored queue blob, bypassing failure injection.
    pub async fn raw(&self) -> Option<String> {
        self.inner.get_item(QUEUE_KEY).await.unwrap()
    }

    /// Overwrite the raw queue blob, bypassing failure injection.
    pub async fn put_raw(&self, value: &str) {
        self.inner.set_item(QUEUE_KEY, value).await.unwrap();
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get_item(&self, key: &str) -> OutboxResult<Option<String>> {
        if self.fail_reads.load(AtomicOrdering::SeqCst) {
            return Err(OutboxError::Storage("read refused".to_string()));
        }
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> OutboxResult<()> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(OutboxError::Storage("write refused".to_string()));
        }
        self.inner.set_item(key, value).await
    }
}

/// Orchestrates a queue, a submitter, and their mocks.
pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub kv: Arc<FlakyStore>,
    pub queue: Arc<OfflineQueue>,
    pub submitter: Submitter,
    pub book: Arc<LogBook>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(SubmitterConfig::new(BASE_URL).with_authorization(AUTHORIZATION))
    }

    pub fn with_config(config: SubmitterConfig) -> Self {
        let transport = Arc::new(MockTransport::new());
        let kv = Arc::new(FlakyStore::new());
        let queue = Arc::new(OfflineQueue::new(
            QueueStore::new(kv.clone()),
            transport.clone(),
        ));
        let submitter = Submitter::new(config, queue.clone());

        Self {
            transport,
            kv,
            queue,
            submitter,
            book: Arc::new(LogBook::new()),
        }
    }

    /// The log book as a shareable activity log.
    pub fn log(&self) -> Arc<dyn ActivityLog> {
        self.book.clone()
    }

    /// Seed the store directly with `records`.
    pub async fn seed(&self, records: &[QueuedRequest]) {
        self.queue.store().save(records).await.unwrap();
    }

    /// Current persisted queue, read without failure injection.
    pub async fn persisted(&self) -> Vec<QueuedRequest> {
        match self.kv.raw().await {
            Some(raw) => serde_json::from_str(&raw).unwrap(),
            None => Vec::new(),
        }
    }

    pub async fn replay(&self, filter: Option<&str>) -> crate::ReplayReport {
        self.queue.process_queue(&*self.book, filter).await
    }
}

/// A queued POST to `url` with a JSON body and a fixed enqueue time.
pub fn queued(url: &str, body: &str, enqueued_at: i64) -> QueuedRequest {
    QueuedRequest::with_enqueued_at(
        OutboundRequest::post(url, body).with_header("Content-Type", "application/json"),
        enqueued_at,
    )
}
