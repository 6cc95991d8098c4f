//! Request outbox - submit scans and locations, queueing them while offline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use outbox_config_and_utils::{init_logging, Config, Paths};
use request_outbox::{
    now_iso, ActivityLog, Endpoint, FileStore, LogEntry, LogKind, OfflineQueue, QueueStore,
    QueuedRequest, ReplayReport, ReqwestTransport, ScanPayload, SubmissionResult, Submitter,
    SubmitterConfig, TracingLog,
};
use tracing::info;

/// Request outbox command-line interface.
#[derive(Debug, Parser)]
#[command(name = "request-outbox")]
#[command(about = "Send scan and location records, queueing them while offline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, queue, and logs. Defaults to ~/.request-outbox
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a QR scan
    Scan {
        /// Scanned QR contents
        #[arg(long)]
        qr: String,
        /// Where the scan happened
        #[arg(long)]
        location: String,
        /// Scan time (RFC 3339). Defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    /// Submit the current location
    Location {
        #[arg(long)]
        location: String,
    },
    /// Retry queued requests
    Replay {
        /// Only retry requests whose URL contains this text
        #[arg(long)]
        filter: Option<String>,
        /// Keep retrying every SECS seconds until interrupted
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        every: Option<u64>,
    },
    /// Show queue depth and endpoints
    Status,
    /// List queued requests
    List,
}

/// Everything a command needs, built once from config.
struct App {
    store_dir: PathBuf,
    queue: Arc<OfflineQueue>,
    submitter: Submitter,
    log: Arc<dyn ActivityLog>,
}

impl App {
    fn new(config: Config, paths: &Paths) -> anyhow::Result<Self> {
        let store_dir = config.resolve_store_dir(paths);
        let transport = ReqwestTransport::new(config.request_timeout_secs)
            .context("failed to build HTTP client")?;
        let store = QueueStore::new(Arc::new(FileStore::new(&store_dir)));
        let queue = Arc::new(OfflineQueue::new(store, Arc::new(transport)));
        let submitter = Submitter::new(
            SubmitterConfig {
                api_base_url: config.api_base_url.clone(),
                authorization: config.authorization_header(),
            },
            queue.clone(),
        );

        Ok(Self {
            store_dir,
            queue,
            submitter,
            log: Arc::new(TracingLog),
        })
    }

    async fn scan(&self, payload: ScanPayload) -> SubmissionResult {
        self.log.record(
            LogEntry::new(
                LogKind::QrScan,
                format!("QR Scanned: {}, Location: {}", payload.qr, payload.location),
            )
            .with_data(serde_payload(&payload)),
        );

        let result = self.submitter.send_scan(&payload, &self.log).await;
        self.record_result(&result);
        result
    }

    async fn location(&self, location: &str) -> SubmissionResult {
        self.log.record(LogEntry::new(
            LogKind::LocationSend,
            format!("Sending location: {location}"),
        ));

        let result = self.submitter.send_location(location, &self.log).await;
        self.record_result(&result);
        result
    }

    fn record_result(&self, result: &SubmissionResult) {
        let kind = if result.success {
            LogKind::PostResult
        } else {
            LogKind::Error
        };
        self.log.record(
            LogEntry::new(kind, format!("POST Result: {}", result.message))
                .with_data(serde_payload(result)),
        );
    }

    async fn replay(&self, filter: Option<&str>) -> ReplayReport {
        self.queue.process_queue(self.log.as_ref(), filter).await
    }

    async fn replay_every(&self, filter: Option<&str>, secs: u64) {
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        info!(every_secs = secs, filter = filter.unwrap_or(""), "Replaying until interrupted");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.replay(filter).await;
                    print_report(&report);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping replay");
                    break;
                }
            }
        }
    }

    /// URLs submissions are sent to, built the same way the submitter builds them.
    fn endpoint_urls(&self) -> Vec<String> {
        [Endpoint::Scan, Endpoint::Location]
            .into_iter()
            .map(|endpoint| self.submitter.config().url_for(endpoint))
            .collect()
    }

    async fn status(&self) {
        println!("queue length: {}", self.queue.queue_length().await);
        println!("store:        {}", self.store_dir.display());
        for url in self.endpoint_urls() {
            println!("endpoint:     {url}");
        }
    }

    async fn list(&self) {
        let pending = self.queue.pending().await;
        if pending.is_empty() {
            println!("queue is empty");
            return;
        }
        for (index, record) in pending.iter().enumerate() {
            println!("{}", describe(index, record));
        }
    }
}

fn serde_payload<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn describe(index: usize, record: &QueuedRequest) -> String {
    let queued_at = chrono::DateTime::from_timestamp_millis(record.enqueued_at())
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| record.enqueued_at().to_string());
    format!(
        "{:>3}  {}  {} {}  {}",
        index + 1,
        queued_at,
        record.method(),
        record.url(),
        record.body()
    )
}

fn print_result(result: &SubmissionResult) {
    println!("{}", result.message);
    if let Some(error) = &result.error {
        println!("  error: {error}");
    }
}

fn print_report(report: &ReplayReport) {
    println!(
        "replayed {} of {}: {} delivered, {} still queued",
        report.attempted, report.total, report.delivered, report.retained
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths).context("failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level, Some(&paths.log_file()))?;

    let app = App::new(config, &paths)?;

    match cli.command {
        Commands::Scan { qr, location, date } => {
            let payload = ScanPayload {
                qr,
                location,
                date: date.unwrap_or_else(now_iso),
            };
            let result = app.scan(payload).await;
            print_result(&result);
        }
        Commands::Location { location } => {
            let result = app.location(&location).await;
            print_result(&result);
        }
        Commands::Replay { filter, every } => match every {
            Some(secs) => app.replay_every(filter.as_deref(), secs).await,
            None => print_report(&app.replay(filter.as_deref()).await),
        },
        Commands::Status => app.status().await,
        Commands::List => app.list().await,
    }

    // Let the replay triggered by a successful send finish before exiting.
    for report in app.submitter.settle().await {
        if report.total > 0 {
            print_report(&report);
        }
    }

    Ok(())
}
