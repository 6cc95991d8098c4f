//! Send-or-queue submission wrapper used by producers.

use crate::{
    ActivityLog, LogEntry, LogKind, OfflineQueue, OutboundRequest, OutboxError, OutboxResult,
    QueuedRequest, ReplayReport,
};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Submission configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterConfig {
    /// Base URL the endpoint paths are appended to.
    pub api_base_url: String,
    /// Full `Authorization` header value, sent when set.
    pub authorization: Option<String>,
}

impl SubmitterConfig {
    /// Target `api_base_url` without credentials.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            authorization: None,
        }
    }

    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    /// Absolute URL of `endpoint`.
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), endpoint.path())
    }
}

/// Submission endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// QR scan records.
    Scan,
    /// Device location reports.
    Location,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Scan => "/api/qr",
            Endpoint::Location => "/api/locations",
        }
    }

    /// Filter applied to the replay triggered after a successful send.
    ///
    /// A scan flushes the whole queue; a location report only flushes
    /// queued location reports.
    pub fn replay_filter(self) -> Option<&'static str> {
        match self {
            Endpoint::Scan => None,
            Endpoint::Location => Some("/api/locations"),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Endpoint::Scan => "QR",
            Endpoint::Location => "Location",
        }
    }
}

/// Body of a scan submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPayload {
    pub qr: String,
    pub location: String,
    pub date: String,
}

/// Body of a location submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPayload {
    pub location: String,
    pub date: String,
}

/// Result of a send-or-queue call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Current time in the format used for payload dates.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Attempts an immediate send and falls back to the offline queue.
pub struct Submitter {
    config: SubmitterConfig,
    queue: Arc<OfflineQueue>,
    replays: Mutex<Vec<JoinHandle<ReplayReport>>>,
}

impl Submitter {
    pub fn new(config: SubmitterConfig, queue: Arc<OfflineQueue>) -> Self {
        Self {
            config,
            queue,
            replays: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    /// Build the exact request sent for `payload`.
    pub fn build_request<P: Serialize>(
        &self,
        endpoint: Endpoint,
        payload: &P,
    ) -> OutboxResult<OutboundRequest> {
        let body = serde_json::to_string(payload)?;
        let mut request = OutboundRequest::post(self.config.url_for(endpoint), body)
            .with_header("Content-Type", "application/json");
        if let Some(auth) = &self.config.authorization {
            request = request.with_header("Authorization", auth.clone());
        }
        Ok(request)
    }

    /// Send `payload`, queueing the request on any failure.
    ///
    /// On success a replay cycle is spawned in the background with the
    /// endpoint's filter. Its outcome never affects the returned result and it
    /// may finish before or after the caller continues.
    pub async fn send_or_queue<P: Serialize>(
        &self,
        endpoint: Endpoint,
        payload: &P,
        log: &Arc<dyn ActivityLog>,
    ) -> SubmissionResult {
        let label = endpoint.label();

        let request = match self.build_request(endpoint, payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(endpoint = ?endpoint, error = %e, "Payload could not be encoded");
                return SubmissionResult {
                    success: false,
                    message: format!("Failed to send {label} data."),
                    error: Some(e.to_string()),
                };
            }
        };

        match self.attempt(&request).await {
            Ok(()) => {
                info!(url = %request.url, "Submission delivered");
                self.spawn_replay(endpoint.replay_filter(), log.clone());
                SubmissionResult {
                    success: true,
                    message: format!("{label} data sent successfully."),
                    error: None,
                }
            }
            Err(e) => {
                let error = e.to_string();
                warn!(url = %request.url, error = %error, "Submission failed, queueing");

                self.queue.queue_request(QueuedRequest::new(request)).await;
                let queue_length = self.queue.queue_length().await;

                log.record(
                    LogEntry::new(
                        LogKind::RequestQueued,
                        format!("Request to {} queued: {error}", endpoint.path()),
                    )
                    .with_data(serde_json::json!({
                        "error": error,
                        "queueLength": queue_length,
                    })),
                );

                SubmissionResult {
                    success: false,
                    message: format!(
                        "Failed to send {label} data. Queueing request for retry (queue length: {queue_length})."
                    ),
                    error: Some(error),
                }
            }
        }
    }

    /// Submit a QR scan.
    pub async fn send_scan(
        &self,
        payload: &ScanPayload,
        log: &Arc<dyn ActivityLog>,
    ) -> SubmissionResult {
        self.send_or_queue(Endpoint::Scan, payload, log).await
    }

    /// Submit a location report stamped with the current time.
    pub async fn send_location(
        &self,
        location: &str,
        log: &Arc<dyn ActivityLog>,
    ) -> SubmissionResult {
        let payload = LocationPayload {
            location: location.to_string(),
            date: now_iso(),
        };
        self.send_or_queue(Endpoint::Location, &payload, log).await
    }

    /// Wait for every background replay spawned so far.
    pub async fn settle(&self) -> Vec<ReplayReport> {
        let handles: Vec<_> = std::mem::take(&mut *self.replays.lock());
        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(error = %e, "Background replay did not complete"),
            }
        }
        reports
    }

    async fn attempt(&self, request: &OutboundRequest) -> OutboxResult<()> {
        let response = self.queue.transport().send(request).await?;
        if response.is_ok() {
            Ok(())
        } else {
            Err(OutboxError::Rejected {
                status: response.status,
                body: response.body,
            })
        }
    }

    fn spawn_replay(&self, filter: Option<&'static str>, log: Arc<dyn ActivityLog>) {
        let queue = self.queue.clone();
        let handle = tokio::spawn(async move { queue.process_queue(log.as_ref(), filter).await });

        let mut replays = self.replays.lock();
        replays.retain(|h| !h.is_finished());
        replays.push(handle);
        debug!(pending = replays.len(), filter = filter.unwrap_or(""), "Spawned background replay");
    }
}
