//! Offline queue: enqueue on failure, replay later.

use crate::{
    ActivityLog, HttpTransport, OutboxResult, QueueStore, QueuedRequest,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome counts of one replay cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Records in the snapshot when the cycle started.
    pub total: usize,
    /// Records a delivery was attempted for.
    pub attempted: usize,
    /// Records delivered and dropped from the queue.
    pub delivered: usize,
    /// Records written back (filtered out or failed again).
    pub retained: usize,
}

/// Durable queue of failed requests with filtered replay.
///
/// The store is a single shared snapshot with last-writer-wins semantics.
/// Overlapping calls that load and save concurrently may lose each other's
/// updates; callers are expected to drive replay from one place at a time.
pub struct OfflineQueue {
    store: QueueStore,
    transport: Arc<dyn HttpTransport>,
}

impl OfflineQueue {
    pub fn new(store: QueueStore, transport: Arc<dyn HttpTransport>) -> Self {
        Self { store, transport }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Append a failed request to the end of the queue.
    ///
    /// Best effort: the request has already failed once and that failure was
    /// reported upstream, so any store error here is logged and swallowed.
    pub async fn queue_request(&self, request: QueuedRequest) {
        if let Err(e) = self.try_queue_request(request).await {
            warn!(error = %e, "Failed to queue request");
        }
    }

    async fn try_queue_request(&self, request: QueuedRequest) -> OutboxResult<()> {
        let mut queue = self.store.read().await?;
        debug!(url = %request.url(), depth = queue.len() + 1, "Queueing request");
        queue.push(request);
        self.store.save(&queue).await
    }

    /// Number of requests currently persisted. 0 if the store cannot be read.
    pub async fn queue_length(&self) -> usize {
        self.store.load().await.len()
    }

    /// Snapshot of the pending requests in retry order.
    pub async fn pending(&self) -> Vec<QueuedRequest> {
        self.store.load().await
    }

    /// Run one replay cycle.
    ///
    /// Every record matching `url_filter` (all records when `None`) is sent
    /// once, sequentially, in queue order. Delivered records are dropped; the
    /// rest, including records skipped by the filter, are written back in
    /// their original order in a single save. Never fails: store errors are
    /// reported through `log`.
    pub async fn process_queue(
        &self,
        log: &dyn ActivityLog,
        url_filter: Option<&str>,
    ) -> ReplayReport {
        match self.replay(log, url_filter).await {
            Ok(report) => report,
            Err(e) => {
                log.log(&format!("Error processing request queue: {e}"));
                warn!(error = %e, "Replay cycle aborted");
                ReplayReport::default()
            }
        }
    }

    async fn replay(
        &self,
        log: &dyn ActivityLog,
        url_filter: Option<&str>,
    ) -> OutboxResult<ReplayReport> {
        let queue = self.store.read().await?;
        if queue.is_empty() {
            return Ok(ReplayReport::default());
        }

        log.log(&format!("Processing queue with {} requests.", queue.len()));

        let mut report = ReplayReport {
            total: queue.len(),
            ..Default::default()
        };
        let mut retained = Vec::with_capacity(queue.len());

        for record in queue {
            if !record.matches_filter(url_filter) {
                retained.push(record);
                continue;
            }

            report.attempted += 1;
            if self.redeliver(log, &record).await {
                report.delivered += 1;
            } else {
                retained.push(record);
            }
        }

        report.retained = retained.len();
        self.store.save(&retained).await?;

        info!(
            total = report.total,
            attempted = report.attempted,
            delivered = report.delivered,
            retained = report.retained,
            filter = url_filter.unwrap_or(""),
            "Replay cycle finished"
        );
        Ok(report)
    }

    /// Attempt one record. Returns whether it was delivered.
    async fn redeliver(&self, log: &dyn ActivityLog, record: &QueuedRequest) -> bool {
        match self.transport.send(record.request()).await {
            Ok(response) if response.is_ok() => {
                log.log(&format!("Successfully re-sent queued request: {}", record.url()));
                true
            }
            Ok(response) => {
                log.log(&format!(
                    "Failed to re-send queued request (HTTP error): {}, status: {}, message: {}",
                    record.url(),
                    response.status,
                    response.body
                ));
                false
            }
            Err(e) => {
                log.log(&format!(
                    "Failed to re-send queued request (network error): {}, error: {}",
                    record.url(),
                    e
                ));
                false
            }
        }
    }
}
