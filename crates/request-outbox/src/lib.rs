//! Durable offline request queue with filtered replay.
//!
//! This crate provides:
//! - QueueStore: the persisted queue snapshot over a pluggable key-value store
//! - OfflineQueue: enqueue on failure and sequential replay with an optional URL filter
//! - Submitter: send-or-queue wrapper used by producers
//! - ReqwestTransport: HTTP transport backed by reqwest

mod error;
mod file_store;
mod log;
mod queue;
mod request;
mod store;
mod submit;
mod transport;

#[cfg(test)]
mod tests;

pub use error::{OutboxError, OutboxResult};
pub use file_store::FileStore;
pub use log::{ActivityLog, LogBook, LogEntry, LogKind, TracingLog, DEFAULT_LOG_CAPACITY};
pub use queue::{OfflineQueue, ReplayReport};
pub use request::{OutboundRequest, QueuedRequest};
pub use store::{KeyValueStore, MemoryStore, QueueStore, QUEUE_KEY};
pub use submit::{
    now_iso, Endpoint, LocationPayload, ScanPayload, SubmissionResult, Submitter,
    SubmitterConfig,
};
pub use transport::{HttpTransport, ReqwestTransport, TransportResponse, DEFAULT_TIMEOUT_SECS};
