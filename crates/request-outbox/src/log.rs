//! Activity log sinks for queue and submission progress.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

/// Default number of entries kept by a [`LogBook`].
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Category of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    QrScan,
    PostResult,
    LocationSend,
    RequestQueued,
    Queue,
    Error,
}

/// One structured activity entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 timestamp
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            kind,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Receiver of human-readable progress lines.
///
/// The queue only ever emits plain lines through [`ActivityLog::log`].
/// Producers may pass richer entries through [`ActivityLog::record`].
pub trait ActivityLog: Send + Sync {
    fn log(&self, message: &str);

    fn record(&self, entry: LogEntry) {
        self.log(&entry.message);
    }
}

impl<F> ActivityLog for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

/// Bounded in-memory log, newest entry first.
pub struct LogBook {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBook {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of all entries, newest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Messages only, newest first.
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    /// Whether any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for LogBook {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog for LogBook {
    fn log(&self, message: &str) {
        self.record(LogEntry::new(LogKind::Queue, message));
    }

    fn record(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }
}

/// Forwards every line to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl ActivityLog for TracingLog {
    fn log(&self, message: &str) {
        info!(target: "request_outbox::activity", "{}", message);
    }

    fn record(&self, entry: LogEntry) {
        match &entry.data {
            Some(data) => info!(
                target: "request_outbox::activity",
                kind = ?entry.kind,
                data = %data,
                "{}",
                entry.message
            ),
            None => info!(target: "request_outbox::activity", kind = ?entry.kind, "{}", entry.message),
        }
    }
}
