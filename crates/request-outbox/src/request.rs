//! Outbound request and queued request records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The exact parameters of one HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// Absolute endpoint URL.
    pub url: String,
    /// HTTP verb.
    pub method: String,
    /// Request headers, kept in a deterministic order.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Already-serialized payload.
    pub body: String,
}

impl OutboundRequest {
    /// Create a POST request with no headers.
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// One pending outbound call persisted in the queue.
///
/// A record is created once, when delivery first fails, and is never mutated
/// afterwards. `enqueued_at` therefore always measures age from the first
/// failure, not from the last replay attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    #[serde(flatten)]
    request: OutboundRequest,
    /// Milliseconds since the Unix epoch. Older snapshots call this `timestamp`.
    #[serde(rename = "enqueuedAt", alias = "timestamp")]
    enqueued_at: i64,
}

impl QueuedRequest {
    /// Wrap a failed request, stamping it with the current time.
    pub fn new(request: OutboundRequest) -> Self {
        Self::with_enqueued_at(request, chrono::Utc::now().timestamp_millis())
    }

    /// Wrap a failed request with an explicit enqueue time.
    pub fn with_enqueued_at(request: OutboundRequest, enqueued_at: i64) -> Self {
        Self {
            request,
            enqueued_at,
        }
    }

    pub fn request(&self) -> &OutboundRequest {
        &self.request
    }

    pub fn url(&self) -> &str {
        &self.request.url
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.request.headers
    }

    pub fn body(&self) -> &str {
        &self.request.body
    }

    pub fn enqueued_at(&self) -> i64 {
        self.enqueued_at
    }

    /// Whether this record is eligible for a replay restricted to `url_filter`.
    pub fn matches_filter(&self, url_filter: Option<&str>) -> bool {
        match url_filter {
            Some(filter) => self.request.url.contains(filter),
            None => true,
        }
    }
}
